//! CDP runtime events to page errors and console messages.

use crate::collector::{ConsoleLevel, PageEvents};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, EventExceptionThrown, RemoteObject,
};
use chromiumoxide::listeners::EventStream;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

enum RuntimeEvent {
    Exception(Arc<EventExceptionThrown>),
    Console(Arc<EventConsoleApiCalled>),
}

/// Feeds both event streams into `events` until the page goes away.
pub(super) async fn forward_page_events(
    exceptions: EventStream<EventExceptionThrown>,
    console: EventStream<EventConsoleApiCalled>,
    events: PageEvents,
) {
    let mut merged = Box::pin(stream::select(
        exceptions.map(RuntimeEvent::Exception),
        console.map(RuntimeEvent::Console),
    ));

    while let Some(event) = merged.next().await {
        match event {
            RuntimeEvent::Exception(event) => events.record_error(exception_message(&event)),
            RuntimeEvent::Console(event) => {
                events.record_console(console_level(&event), console_text(&event), console_source(&event));
            }
        }
    }
}

fn exception_message(event: &EventExceptionThrown) -> String {
    let details = &event.exception_details;
    details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone())
        .unwrap_or_else(|| details.text.clone())
}

fn console_level(event: &EventConsoleApiCalled) -> ConsoleLevel {
    match event.r#type {
        ConsoleApiCalledType::Log => ConsoleLevel::Log,
        ConsoleApiCalledType::Info => ConsoleLevel::Info,
        ConsoleApiCalledType::Warning => ConsoleLevel::Warning,
        ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => ConsoleLevel::Error,
        ConsoleApiCalledType::Debug => ConsoleLevel::Debug,
        _ => ConsoleLevel::Other,
    }
}

/// Arguments joined with spaces, the way the console prints them.
fn console_text(event: &EventConsoleApiCalled) -> String {
    event
        .args
        .iter()
        .map(render_argument)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_argument(arg: &RemoteObject) -> String {
    match &arg.value {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => arg
            .description
            .clone()
            .unwrap_or_else(|| "<object>".to_string()),
    }
}

fn console_source(event: &EventConsoleApiCalled) -> Option<String> {
    let frame = event.stack_trace.as_ref()?.call_frames.first()?;
    Some(format!(
        "{}:{}:{}",
        frame.url, frame.line_number, frame.column_number
    ))
}
