//! Browser raw socket backed by `web_sys::WebSocket`.

use super::{Socket, SocketEvent, TransportError, TransportResult};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// Text WebSocket for WASM.
///
/// Browser callbacks push into a shared queue drained by [`Socket::poll`].
pub struct WasmSocket {
    ws: Option<WebSocket>,
    events: Rc<RefCell<Vec<SocketEvent>>>,
    // Keep the closures alive for as long as the socket is.
    _on_open: Option<Closure<dyn Fn()>>,
    _on_message: Option<Closure<dyn Fn(MessageEvent)>>,
    _on_close: Option<Closure<dyn Fn(CloseEvent)>>,
    _on_error: Option<Closure<dyn Fn(ErrorEvent)>>,
}

impl WasmSocket {
    pub fn new() -> Self {
        Self {
            ws: None,
            events: Rc::new(RefCell::new(Vec::new())),
            _on_open: None,
            _on_message: None,
            _on_close: None,
            _on_error: None,
        }
    }

    fn detach(&mut self) {
        if let Some(ws) = self.ws.take() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onclose(None);
            ws.set_onerror(None);
            let _ = ws.close();
        }
        self._on_open = None;
        self._on_message = None;
        self._on_close = None;
        self._on_error = None;
    }
}

impl Socket for WasmSocket {
    fn open(&mut self, url: &str) -> TransportResult<()> {
        if self.ws.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let ws = WebSocket::new(url)
            .map_err(|e| TransportError::InvalidUrl(format!("Failed to create WebSocket: {:?}", e)))?;
        ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

        let events_open = self.events.clone();
        let on_open = Closure::wrap(Box::new(move || {
            events_open.borrow_mut().push(SocketEvent::Opened);
        }) as Box<dyn Fn()>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let events_msg = self.events.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
                events_msg.borrow_mut().push(SocketEvent::Text(txt.into()));
            } else if let Ok(buf) = e.data().dyn_into::<js_sys::ArrayBuffer>() {
                let bytes = js_sys::Uint8Array::new(&buf).to_vec();
                match String::from_utf8(bytes) {
                    Ok(text) => events_msg.borrow_mut().push(SocketEvent::Text(text)),
                    Err(_) => log::warn!("Dropping non-UTF-8 binary frame"),
                }
            }
        }) as Box<dyn Fn(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let events_close = self.events.clone();
        let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
            log::info!("WebSocket closed: code {}", e.code());
            events_close.borrow_mut().push(SocketEvent::Closed);
        }) as Box<dyn Fn(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let events_err = self.events.clone();
        let on_error = Closure::wrap(Box::new(move |_e: ErrorEvent| {
            events_err
                .borrow_mut()
                .push(SocketEvent::Error("WebSocket error".to_string()));
        }) as Box<dyn Fn(ErrorEvent)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.ws = Some(ws);
        self._on_open = Some(on_open);
        self._on_message = Some(on_message);
        self._on_close = Some(on_close);
        self._on_error = Some(on_error);
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> TransportResult<()> {
        match self.ws {
            Some(ref ws) => ws
                .send_with_str(text)
                .map_err(|e| TransportError::Send(format!("{:?}", e))),
            None => Err(TransportError::NotConnected),
        }
    }

    fn poll(&mut self) -> Vec<SocketEvent> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        if events.contains(&SocketEvent::Closed) {
            self.detach();
        }
        events
    }

    fn close(&mut self) {
        self.detach();
        self.events.borrow_mut().clear();
    }
}

impl Default for WasmSocket {
    fn default() -> Self {
        Self::new()
    }
}
