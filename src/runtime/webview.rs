//! Webview hosting the rendering surface
//!
//! One wry WebView fills the window. IPC from the page is forwarded to the
//! event loop as a [`UserEvent`]; host messages go back by evaluating a call
//! to the bridge's receive function.

use std::rc::Rc;

use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoopProxy;
use winit::window::Window;
use wry::{Rect, WebView, WebViewBuilder};

use md_surface::messages::HostMsg;

use super::app::UserEvent;

pub struct SurfaceWebview {
    webview: WebView,
}

impl SurfaceWebview {
    pub fn new(
        window: &Rc<Window>,
        html: &str,
        proxy: EventLoopProxy<UserEvent>,
        generation: u64,
    ) -> Result<Self, wry::Error> {
        let webview = WebViewBuilder::new()
            .with_html(html)
            .with_bounds(full_window(window.inner_size()))
            .with_transparent(false)
            .with_ipc_handler(move |request: wry::http::Request<String>| {
                let body = request.into_body();
                if proxy.send_event(UserEvent::Ipc { generation, body }).is_err() {
                    tracing::debug!("Event loop closed, dropping surface message");
                }
            })
            .with_navigation_handler(|url| {
                // Links are routed through `open-link`; never navigate away from the surface
                if url.starts_with("http://") || url.starts_with("https://") {
                    tracing::debug!("Blocked surface navigation to {}", url);
                    false
                } else {
                    true
                }
            })
            .build_as_child(window)?;

        tracing::debug!("Created surface webview (generation {})", generation);
        Ok(Self { webview })
    }

    /// Deliver a message to the surface bridge
    pub fn post(&self, msg: &HostMsg) {
        let js = format!(
            "window.__surfaceReceive && window.__surfaceReceive({});",
            msg.to_json()
        );
        if let Err(e) = self.webview.evaluate_script(&js) {
            tracing::warn!("Failed to deliver message to surface: {}", e);
        }
    }

    /// Resize to cover the whole window
    pub fn resize(&self, size: PhysicalSize<u32>) {
        if let Err(e) = self.webview.set_bounds(full_window(size)) {
            tracing::warn!("Failed to resize surface: {}", e);
        }
    }

    pub fn focus(&self) {
        let _ = self.webview.focus();
    }
}

fn full_window(size: PhysicalSize<u32>) -> Rect {
    use wry::dpi::{PhysicalPosition, PhysicalSize};

    Rect {
        position: PhysicalPosition::new(0, 0).into(),
        size: PhysicalSize::new(size.width, size.height).into(),
    }
}
