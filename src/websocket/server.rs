use std::pin::Pin;

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::registry::ConnectionHandle;
use super::session::Session;
use crate::error::{AppError, WebSocketError};
use crate::AppState;

/// A text frame queued for this connection by another session.
#[derive(Debug)]
pub struct Outbound(String);

/// Websocket actor driving one [`Session`].
pub struct ChatSession {
    session: Session,
    peer_addr: String,
}

impl ChatSession {
    pub fn new(session: Session, peer_addr: String) -> Self {
        Self { session, peer_addr }
    }

    fn outbound_stream(
        rx: mpsc::UnboundedReceiver<String>,
    ) -> Pin<Box<dyn Stream<Item = Outbound>>> {
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|text| (Outbound(text), rx))
        }))
    }

    fn handle_text(&mut self, text: &str, ctx: &mut <Self as Actor>::Context) {
        if let Err(e) = self.session.handle_frame(text) {
            self.fail(e, ctx);
        }
    }

    /// Ends the session after a frame it cannot recover from.
    fn fail(&mut self, err: WebSocketError, ctx: &mut <Self as Actor>::Context) {
        warn!(
            "Closing session for {} ({}): {}",
            self.session.username(),
            self.peer_addr,
            err
        );
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Invalid,
            description: Some(err.to_string()),
        }));
        ctx.stop();
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, rx) = mpsc::unbounded_channel();
        ctx.add_stream(Self::outbound_stream(rx));
        self.session.open(ConnectionHandle::new(tx));
        info!(
            "WebSocket connection established for {} from {}",
            self.session.username(),
            self.peer_addr
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if self.session.close() {
            info!(
                "WebSocket connection closed for {} from {}",
                self.session.username(),
                self.peer_addr
            );
        }
    }
}

impl StreamHandler<Outbound> for ChatSession {
    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // All handles dropped: this connection was replaced in the registry. It stays open.
        debug!("Outbound channel for {} closed", self.session.username());
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(bin)) => {
                self.fail(
                    WebSocketError::Decode(format!("binary frame of {} bytes", bin.len())),
                    ctx,
                );
            }
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                info!("{} closed the connection: {:?}", self.session.username(), reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                self.fail(
                    WebSocketError::Protocol("fragmented frames are not supported".into()),
                    ctx,
                );
            }
            Ok(ws::Message::Nop) => {}
            Err(e) => {
                let err = read_error(e);
                error!(
                    "Error reading from {} ({}): {}",
                    self.session.username(),
                    self.peer_addr,
                    err
                );
                ctx.stop();
            }
        }
    }
}

/// A failed read on the socket. I/O failures mean the peer is gone.
fn read_error(err: ws::ProtocolError) -> WebSocketError {
    match err {
        ws::ProtocolError::Io(e) => {
            debug!("Socket read failed: {}", e);
            WebSocketError::PeerDisconnected
        }
        other => WebSocketError::Protocol(other.to_string()),
    }
}

/// `GET /ws/{username}`: upgrades the request and starts a [`ChatSession`].
pub async fn ws_route(
    req: HttpRequest,
    stream: web::Payload,
    username: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let username = username.into_inner();
    if username.is_empty() {
        return Err(AppError::ValidationError("username must not be empty".into()).into());
    }

    let peer_addr = req
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!("New WebSocket connection request for {} from {}", username, peer_addr);

    let session = Session::new(username, state.registry.clone(), state.messages.clone());
    ws::start(ChatSession::new(session, peer_addr), &req, stream)
}
