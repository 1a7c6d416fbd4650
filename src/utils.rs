//! 浏览器环境的辅助工具。

use wasm_bindgen::JsValue;

/// 输出一行调试日志到浏览器控制台。
pub fn console_log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}
