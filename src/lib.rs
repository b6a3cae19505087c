pub mod color;
pub mod config;
pub mod diagram;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod lexer;
pub mod measure;
pub mod parser;
pub mod routing;
pub mod scene;
pub mod schema;
pub mod svg;

#[cfg(feature = "cli")]
pub mod cli;

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

pub use config::AppConfig;
pub use diagram::{Diagram, DragSession};
pub use error::Error;
pub use parser::{SyntaxError, parse};
pub use scene::{Canvas, Scene};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Render table schema source to SVG
#[wasm_bindgen(js_name = "erdToSvg")]
pub fn render_erd(source: &str) -> Result<String, String> {
    let canvas = Canvas::load(source, &AppConfig::default()).map_err(|e| e.to_string())?;
    Ok(canvas.render_svg())
}

/// Interactive diagram for the browser: tables can be dragged, and every applied
/// move reroutes the connectors and hands the new SVG to the registered callback.
#[wasm_bindgen(js_name = "ErdCanvas")]
pub struct WasmCanvas {
    canvas: Canvas,
    session: DragSession<'static>,
    dirty: Rc<Cell<bool>>,
    on_change: Option<js_sys::Function>,
}

#[wasm_bindgen(js_class = "ErdCanvas")]
impl WasmCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str) -> Result<WasmCanvas, String> {
        let canvas = Canvas::load(source, &AppConfig::default()).map_err(|e| e.to_string())?;
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);

        Ok(Self {
            canvas,
            session: DragSession::with_recompute(move || flag.set(true)),
            dirty,
            on_change: None,
        })
    }

    /// Register `callback(svg)`, called after every applied drag move.
    #[wasm_bindgen(js_name = "setRecompute")]
    pub fn set_recompute(&mut self, callback: js_sys::Function) {
        self.on_change = Some(callback);
    }

    pub fn press(&mut self, table: &str) {
        self.session.press(table);
    }

    #[wasm_bindgen(js_name = "dragBy")]
    pub fn drag_by(&mut self, dx: f64, dy: f64) -> bool {
        self.session.drag_by(self.canvas.diagram_mut(), dx, dy);
        if !self.dirty.replace(false) {
            return false;
        }

        self.canvas.refresh();
        if let Some(callback) = &self.on_change {
            let svg = JsValue::from_str(&self.canvas.render_svg());
            if let Err(err) = callback.call1(&JsValue::NULL, &svg) {
                log::warn!(error:? = err; "Recompute callback failed");
            }
        }
        true
    }

    pub fn release(&mut self) {
        self.session.release();
    }

    pub fn svg(&self) -> String {
        self.canvas.render_svg()
    }
}
