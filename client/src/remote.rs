//! `fetch` transport and browser clock

use epe_gacha_core::clock::Clock;
use epe_gacha_core::sync::{HttpRequest, HttpResponse, HttpTransport};
use epe_gacha_core::types::Timestamp;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, Request, RequestCache, RequestInit, Response};

/// `Date.now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> Timestamp {
        js_sys::Date::now() as Timestamp
    }
}

/// Sends requests through `window.fetch`
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

fn describe(error: JsValue) -> String {
    error
        .as_string()
        .unwrap_or_else(|| format!("{:?}", error))
}

impl FetchTransport {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

        let init = RequestInit::new();
        init.set_method(request.method.as_str());
        init.set_cache(RequestCache::NoStore);
        let signal = AbortSignal::timeout_with_u32(request.timeout_ms);
        init.set_signal(Some(&signal));
        if let Some(body) = &request.body {
            init.set_body(&JsValue::from_str(body));
        }

        let fetch_request = Request::new_with_str_and_init(&request.url, &init)?;
        for (name, value) in &request.headers {
            fetch_request.headers().set(name, value)?;
        }

        let response: Response = JsFuture::from(window.fetch_with_request(&fetch_request))
            .await?
            .dyn_into()?;
        let location = response.headers().get("Location").ok().flatten();
        let body = JsFuture::from(response.text()?)
            .await?
            .as_string()
            .unwrap_or_default();

        Ok(HttpResponse {
            status: response.status(),
            body,
            location,
        })
    }
}

impl HttpTransport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.fetch(request).await.map_err(describe)
    }
}
