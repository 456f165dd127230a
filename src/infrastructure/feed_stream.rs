// Chunked NDJSON streaming of a widget's display state
use crate::domain::market::WidgetView;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// One JSON document per line: the current view first, then every change
/// until the widget's feed goes away.
pub fn ndjson_feed_response(rx: watch::Receiver<WidgetView>) -> Result<Response<Body>, StatusCode> {
    let stream = WatchStream::new(rx).map(|view| serialize_line(&view));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn serialize_line(view: &WidgetView) -> Result<Bytes, std::io::Error> {
    let mut line = BytesMut::with_capacity(256).writer();
    serde_json::to_writer(&mut line, view)?;
    let mut line = line.into_inner();
    line.put_u8(b'\n');
    Ok(line.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::WidgetData;
    use chrono::Utc;

    #[test]
    fn test_line_is_newline_terminated_json() {
        let line = serialize_line(&WidgetView::loading()).unwrap();

        assert_eq!(line.last(), Some(&b'\n'));
        let value: serde_json::Value = serde_json::from_slice(&line[..line.len() - 1]).unwrap();
        assert_eq!(value["loading"], true);
    }

    #[tokio::test]
    async fn test_stream_ends_when_feed_dropped() {
        let (tx, rx) = watch::channel(WidgetView::loading());
        let response = ndjson_feed_response(rx).unwrap();

        let mut view = WidgetView::loading();
        view.loaded(WidgetData::Table { quotes: Vec::new() }, Utc::now());
        tx.send_replace(view);
        drop(tx);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let lines: Vec<&[u8]> = body.split(|b| *b == b'\n').filter(|l| !l.is_empty()).collect();

        assert!(!lines.is_empty());
        let last: serde_json::Value = serde_json::from_slice(lines[lines.len() - 1]).unwrap();
        assert_eq!(last["loading"], false);
        assert_eq!(last["data"]["kind"], "table");
    }
}
