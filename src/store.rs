//! Slice results and the revocable display handles that expose them.

use crate::geometry::Cell;
use crate::render::{RenderedSlice, PNG_MIME};
use crate::Result;
use std::collections::HashSet;
use std::fmt;

/// Source of revocable references to in-memory binaries (object URLs in a browser).
///
/// Handles are not reclaimed automatically; every created handle must be
/// passed back to `revoke`.
pub trait HandleRegistry {
    type Handle: Clone + fmt::Debug;

    fn create(&mut self, bytes: &[u8], mime: &str) -> Result<Self::Handle>;
    fn revoke(&mut self, handle: &Self::Handle);
}

/// In-process registry handing out `mem://slices/<n>` references.
#[derive(Debug, Default)]
pub struct MemoryHandles {
    next: u64,
    live: HashSet<String>,
}

impl MemoryHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: &str) -> bool {
        self.live.contains(handle)
    }
}

impl HandleRegistry for MemoryHandles {
    type Handle = String;

    fn create(&mut self, _bytes: &[u8], _mime: &str) -> Result<String> {
        let handle = format!("mem://slices/{}", self.next);
        self.next += 1;
        self.live.insert(handle.clone());
        Ok(handle)
    }

    fn revoke(&mut self, handle: &String) {
        self.live.remove(handle);
    }
}

#[derive(Clone, Debug)]
pub struct SliceResult<H> {
    pub cell: Cell,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub binary: Vec<u8>,
    pub handle: H,
}

/// Owns the current slice results and their handles.
///
/// `release_all` is the only release point; it runs on replace, on explicit
/// clear and when the store is dropped.
pub struct SliceStore<R: HandleRegistry> {
    registry: R,
    slices: Vec<SliceResult<R::Handle>>,
}

impl<R: HandleRegistry> SliceStore<R> {
    pub fn new(registry: R) -> Self {
        Self { registry, slices: Vec::new() }
    }

    /// Swap in a new result set. Either every slice gets a handle or none do.
    pub fn replace(&mut self, rendered: Vec<RenderedSlice>) -> Result<()> {
        self.release_all();

        let mut slices = Vec::with_capacity(rendered.len());
        for slice in rendered {
            match self.registry.create(&slice.binary, PNG_MIME) {
                Ok(handle) => slices.push(SliceResult {
                    cell: slice.cell,
                    name: slice.name,
                    width: slice.width,
                    height: slice.height,
                    binary: slice.binary,
                    handle,
                }),
                Err(e) => {
                    for created in &slices {
                        self.registry.revoke(&created.handle);
                    }
                    return Err(e);
                }
            }
        }
        self.slices = slices;
        Ok(())
    }

    pub fn release_all(&mut self) {
        if self.slices.is_empty() {
            return;
        }
        tracing::debug!("releasing {} slice handles", self.slices.len());
        for slice in self.slices.drain(..) {
            self.registry.revoke(&slice.handle);
        }
    }

    pub fn slices(&self) -> &[SliceResult<R::Handle>] {
        &self.slices
    }

    pub fn get(&self, index: usize) -> Option<&SliceResult<R::Handle>> {
        self.slices.get(index)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }
}

impl<R: HandleRegistry> Drop for SliceStore<R> {
    fn drop(&mut self) {
        self.release_all();
    }
}
