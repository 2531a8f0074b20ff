//! Handler trait for processing backend commands.
//!
//! Implementors provide the domain logic; [`dispatch`] routes each request
//! envelope to the matching method and always produces a reply envelope.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;
use ycloud_protocol::constants::{
    ERR_BAD_PAYLOAD, ERR_INTERNAL, ERR_NOT_IMPLEMENTED, ERR_UNSUPPORTED,
};
use ycloud_protocol::{CommandName, GreetRequest, GreetResponse, Message};

/// A boxed future resolving to the reply envelope.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Message> + Send + 'a>>;

/// Trait for handling commands sent by the client.
///
/// Default implementations reply "not implemented" (greet excepted) so
/// handlers only need to override the commands they care about.
pub trait Handler: Send + Sync + 'static {
    /// Called for `upload_video`.
    fn on_upload_video(&self, msg: Message) -> HandlerFuture<'_>;

    /// Called for `greet`.
    fn on_greet(&self, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move {
            let req: GreetRequest = match msg.require_payload() {
                Ok(r) => r,
                Err(e) => return msg.reply_error(ERR_BAD_PAYLOAD, format!("invalid payload: {e}")),
            };
            let resp = GreetResponse {
                message: format!("Hello, {}! You've been greeted from Rust!", req.name),
            };
            msg.reply(Some(&resp))
                .unwrap_or_else(|e| msg.reply_error(ERR_INTERNAL, e.to_string()))
        })
    }

    /// Called for `create_user`.
    fn on_create_user(&self, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move { msg.reply_error(ERR_NOT_IMPLEMENTED, "not implemented") })
    }

    /// Called for `username`.
    fn on_username(&self, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move { msg.reply_error(ERR_NOT_IMPLEMENTED, "not implemented") })
    }

    /// Called for `display_directory`.
    fn on_display_directory(&self, msg: Message) -> HandlerFuture<'_> {
        Box::pin(async move { msg.reply_error(ERR_NOT_IMPLEMENTED, "not implemented") })
    }
}

/// Routes a request to the handler method for its command.
///
/// Reply-only commands (`result`, `error`) are not valid requests and are
/// answered with an error.
pub fn dispatch<H: Handler + ?Sized>(handler: &H, msg: Message) -> HandlerFuture<'_> {
    match msg.command {
        CommandName::UploadVideo => handler.on_upload_video(msg),
        CommandName::Greet => handler.on_greet(msg),
        CommandName::CreateUser => handler.on_create_user(msg),
        CommandName::Username => handler.on_username(msg),
        CommandName::DisplayDirectory => handler.on_display_directory(msg),
        CommandName::Result | CommandName::Error => {
            warn!(command = %msg.command, id = %msg.id, "reply received as request");
            let reply =
                msg.reply_error(ERR_UNSUPPORTED, format!("unsupported command: {}", msg.command));
            Box::pin(async move { reply })
        }
    }
}
