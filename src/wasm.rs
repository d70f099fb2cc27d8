//! WebAssembly bindings for gridslice

use crate::editor::{Bounds, LineEditor};
use crate::lines::Axis;
use crate::package;
use crate::session::SliceSession;
use crate::store::HandleRegistry;
use crate::SliceError;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

/// Object URLs backed by `Blob`s. Each must be revoked explicitly.
#[derive(Debug, Default)]
pub struct ObjectUrls;

impl HandleRegistry for ObjectUrls {
    type Handle = String;

    fn create(&mut self, bytes: &[u8], mime: &str) -> crate::Result<String> {
        blob_url(bytes, mime).map_err(|e| SliceError::Handle(format!("{e:?}")))
    }

    fn revoke(&mut self, handle: &String) {
        revoke_url(handle);
    }
}

fn revoke_url(url: &str) {
    if let Err(e) = web_sys::Url::revoke_object_url(url) {
        tracing::warn!("failed to revoke {}: {:?}", url, e);
        web_sys::console::warn_2(&JsValue::from_str("failed to revoke object URL"), &e);
    }
}

fn blob_url(bytes: &[u8], mime: &str) -> Result<String, JsValue> {
    let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    web_sys::Url::create_object_url_with_blob(&blob)
}

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))
}

fn trigger_download(url: &str, name: &str) -> Result<(), JsValue> {
    let document = window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document available"))?;
    let anchor: web_sys::HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(url);
    anchor.set_download(name);
    anchor.click();
    Ok(())
}

/// Resolve on the next macrotask so the browser can paint and handle input.
async fn next_tick() -> Result<(), JsValue> {
    let window = window()?;
    let mut scheduled = Ok(0);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        scheduled = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0);
    });
    scheduled?;
    JsFuture::from(promise).await.map(|_| ())
}

/// Surface an error once in the console and hand it to the caller.
fn to_js(e: SliceError) -> JsValue {
    let message = e.to_string();
    web_sys::console::error_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

fn axis(horizontal: bool) -> Axis {
    if horizontal {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

type SharedSession = Rc<RefCell<SliceSession<ObjectUrls>>>;

fn slice_entries(session: &SliceSession<ObjectUrls>) -> Result<js_sys::Array, JsValue> {
    let result = js_sys::Array::new();
    for slice in session.slices() {
        let entry = js_sys::Object::new();
        js_sys::Reflect::set(&entry, &"name".into(), &slice.name.as_str().into())?;
        js_sys::Reflect::set(&entry, &"url".into(), &slice.handle.as_str().into())?;
        js_sys::Reflect::set(&entry, &"width".into(), &slice.width.into())?;
        js_sys::Reflect::set(&entry, &"height".into(), &slice.height.into())?;
        js_sys::Reflect::set(&entry, &"row".into(), &(slice.cell.row as u32 + 1).into())?;
        js_sys::Reflect::set(&entry, &"col".into(), &(slice.cell.col as u32 + 1).into())?;
        result.push(&entry);
    }
    Ok(result)
}

/// Render every cell, yielding to the event loop between cells, then publish.
/// Resolves to `null` when a newer run or an image change superseded this one.
async fn run_process(session: SharedSession) -> Result<JsValue, JsValue> {
    let job = session.borrow_mut().begin_process().map_err(to_js)?;

    let mut slices = Vec::with_capacity(job.cells().len());
    for cell in job.cells() {
        slices.push(job.render(cell).map_err(to_js)?);
        next_tick().await?;
    }

    let mut session = session.borrow_mut();
    if !session.publish(job.into_batch(slices)).map_err(to_js)? {
        return Ok(JsValue::NULL);
    }
    Ok(slice_entries(&session)?.into())
}

#[wasm_bindgen]
pub struct WasmSlicer {
    session: SharedSession,
    editor: LineEditor,
    bounds: Bounds,
}

#[wasm_bindgen]
impl WasmSlicer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmSlicer {
        WasmSlicer {
            session: Rc::new(RefCell::new(SliceSession::new(ObjectUrls))),
            editor: LineEditor::new(),
            bounds: Bounds::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Load an encoded image file (e.g. bytes of a selected `File`).
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.editor.reset();
        self.session.borrow_mut().load_bytes(bytes).map_err(to_js)
    }

    pub fn load_data_url(&mut self, url: &str) -> Result<(), JsValue> {
        self.editor.reset();
        self.session.borrow_mut().load_data_url(url).map_err(to_js)
    }

    /// Load raw RGBA pixels from a canvas `ImageData`.
    pub fn load_rgba(&mut self, data: &[u8], width: u32, height: u32) -> Result<(), JsValue> {
        self.editor.reset();
        self.session
            .borrow_mut()
            .load_rgba(width, height, data.to_vec())
            .map_err(to_js)
    }

    pub fn clear_image(&mut self) {
        self.editor.reset();
        self.session.borrow_mut().clear_image();
    }

    pub fn add_line(&mut self, horizontal: bool, percent: f64) -> u32 {
        self.session.borrow_mut().add_line(axis(horizontal), percent) as u32
    }

    pub fn remove_line(&mut self, horizontal: bool, index: u32) {
        self.editor.reset();
        self.session.borrow_mut().remove_line(axis(horizontal), index as usize);
    }

    pub fn move_line(&mut self, horizontal: bool, index: u32, percent: f64) -> bool {
        self.session
            .borrow_mut()
            .lines_mut()
            .move_line(axis(horizontal), index as usize, percent)
    }

    pub fn clear_lines(&mut self) {
        self.editor.reset();
        self.session.borrow_mut().lines_mut().clear();
    }

    pub fn auto_layout(&mut self, rows: u32, cols: u32) {
        self.session.borrow_mut().auto_layout(rows, cols);
    }

    /// Current lines as `{"horizontal": [...], "vertical": [...]}`.
    pub fn lines_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().lines())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Cells the current lines produce, without rendering.
    pub fn cells_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.borrow().cells())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn set_horizontal_mode(&mut self, horizontal: bool) {
        self.editor.set_mode(axis(horizontal));
    }

    /// Returns true when the new mode is horizontal.
    pub fn toggle_mode(&mut self) -> bool {
        self.editor.toggle_mode() == Axis::Horizontal
    }

    /// Screen box of the displayed image, from `getBoundingClientRect()`.
    pub fn set_bounds(&mut self, left: f64, top: f64, width: f64, height: f64) {
        self.bounds = Bounds::new(left, top, width, height);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.editor
            .pointer_down(self.session.borrow().lines(), &self.bounds, x, y)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.editor
            .pointer_move(self.session.borrow_mut().lines_mut(), &self.bounds, x, y)
    }

    pub fn pointer_up(&mut self, now_ms: f64) {
        self.editor.pointer_up(now_ms);
    }

    pub fn click(&mut self, x: f64, y: f64, now_ms: f64) -> Option<u32> {
        let mut session = self.session.borrow_mut();
        if session.image().is_none() {
            return None;
        }
        self.editor
            .click(session.lines_mut(), &self.bounds, x, y, now_ms)
            .map(|i| i as u32)
    }

    pub fn set_force_square(&mut self, enabled: bool) {
        self.session.borrow_mut().set_force_square(enabled);
    }

    pub fn set_background(&mut self, color: &str) -> Result<(), JsValue> {
        let background = color.parse().map_err(to_js)?;
        self.session.borrow_mut().set_background(background);
        Ok(())
    }

    /// Slice the image without blocking the page.
    ///
    /// The promise resolves to `[{name, url, width, height, row, col}, ...]`,
    /// or to `null` if a later `process` call or an image change superseded it.
    pub fn process(&self) -> js_sys::Promise {
        future_to_promise(run_process(Rc::clone(&self.session)))
    }

    pub fn slice_url(&self, index: u32) -> Option<String> {
        self.session
            .borrow()
            .slices()
            .get(index as usize)
            .map(|s| s.handle.clone())
    }

    pub fn slice_count(&self) -> u32 {
        self.session.borrow().slices().len() as u32
    }

    pub fn download_one(&self, index: u32) -> Result<(), JsValue> {
        let session = self.session.borrow();
        let slice = session
            .slices()
            .get(index as usize)
            .ok_or_else(|| to_js(SliceError::SliceNotFound(index as usize)))?;
        trigger_download(&slice.handle, &slice.name)
    }

    pub fn download_all(&self) -> Result<(), JsValue> {
        let archive = self
            .session
            .borrow()
            .download_all(package::now_epoch_ms())
            .map_err(to_js)?;
        let url = blob_url(&archive.bytes, "application/zip")?;
        let result = trigger_download(&url, &archive.name);

        // Revoking in the same task can cancel the download in some browsers
        let revoke = Closure::once_into_js(move || revoke_url(&url));
        window()?.set_timeout_with_callback_and_timeout_and_arguments_0(revoke.unchecked_ref(), 0)?;
        result
    }
}

impl Default for WasmSlicer {
    fn default() -> Self {
        Self::new()
    }
}
