use crate::error::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WS_BASE_URL: &str = "wss://api.openai.com/v1/realtime";

const OPENAI_BETA_HEADER: &str = "openai-beta";
const OPENAI_BETA_REALTIME: &str = "realtime=v1";

/// Build the upstream URL for `model` on top of `base_url`.
///
/// # Errors
/// Returns an error if `base_url` is not a valid URL.
pub fn realtime_url(base_url: &str, model: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    url.query_pairs_mut().append_pair("model", model);
    Ok(url)
}

/// Establish a WebSocket connection to the Realtime API.
///
/// # Errors
/// Returns an error if the URL or API key are unusable or the handshake fails.
pub async fn connect(base_url: &str, api_key: &str, model: &str) -> Result<WsStream> {
    let url = realtime_url(base_url, model)?;

    let mut req = url.as_str().into_client_request()?;
    let headers = req.headers_mut();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {api_key}"))?);
    headers.insert(OPENAI_BETA_HEADER, HeaderValue::from_static(OPENAI_BETA_REALTIME));

    let (ws_stream, response) = connect_async(req).await?;

    tracing::info!(status = %response.status(), model, "Connected to OpenAI Realtime");

    Ok(ws_stream)
}
