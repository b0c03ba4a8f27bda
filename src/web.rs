use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;

use futures::{FutureExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::ws::{Message, WebSocket};
use warp::{Filter, Rejection, Reply};

use crate::enclose;
use crate::hub;
use crate::messages::{ClientMessage, ServerMessage};
use crate::room::NewTrack;
use crate::room_server::RoomServer;
use crate::session::Session;
use crate::youtube;

#[derive(Deserialize)]
struct CreateRoomBody {
    name: Option<String>,
}

/// The whole HTTP surface: room creation/lookup, URL resolution, the
/// real-time channel, and static client assets for everything else.
pub fn routes(
    server: RoomServer,
    static_dir: impl Into<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let http = reqwest::Client::new();

    let ws = warp::path("ws").and(warp::ws()).map(enclose! { (server, http)
        move |ws: warp::ws::Ws| {
            let server = server.clone();
            let http = http.clone();
            ws.on_upgrade(move |socket| client_connected(socket, server, http))
        }
    });

    let create_room = warp::path!("api" / "rooms")
        .and(warp::post())
        .and(warp::body::bytes())
        .map(enclose! { (server) move |body: Bytes| {
            // Missing or invalid JSON bodies are treated as an empty body.
            let name = serde_json::from_slice::<CreateRoomBody>(&body)
                .ok()
                .and_then(|b| b.name);
            let summary = server.create_room(name);
            warp::reply::with_status(
                warp::reply::json(&json!({"id": summary.id, "name": summary.name})),
                StatusCode::CREATED,
            )
        }});

    let get_room = warp::path!("api" / "rooms" / String)
        .and(warp::get())
        .map(enclose! { (server) move |room_id: String| {
            match server.room_summary(&room_id) {
                Some(summary) => {
                    warp::reply::with_status(warp::reply::json(&summary), StatusCode::OK)
                }
                None => warp::reply::with_status(
                    warp::reply::json(&json!({"error": "Room not found"})),
                    StatusCode::NOT_FOUND,
                ),
            }
        }});

    let resolve = warp::path!("api" / "youtube" / "resolve")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and_then(enclose! { (http) move |query: HashMap<String, String>| {
            let http = http.clone();
            async move {
                Ok::<_, Infallible>(resolve_video(&http, query.get("url")).await)
            }
        }});

    let assets = warp::fs::dir(static_dir.into());

    ws.or(create_room).or(get_room).or(resolve).or(assets)
}

async fn resolve_video(
    http: &reqwest::Client,
    url: Option<&String>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    let Some(url) = url else {
        return warp::reply::with_status(
            warp::reply::json(&json!({"error": "url query param required"})),
            StatusCode::BAD_REQUEST,
        );
    };
    let Some(youtube_id) = youtube::extract_video_id(url) else {
        return warp::reply::with_status(
            warp::reply::json(&json!({"error": "Invalid YouTube URL"})),
            StatusCode::BAD_REQUEST,
        );
    };
    let meta = youtube::fetch_metadata(http, &youtube_id).await;
    warp::reply::with_status(
        warp::reply::json(&json!({
            "youtubeId": youtube_id,
            "title": meta.title,
            "thumbnail": meta.thumbnail,
        })),
        StatusCode::OK,
    )
}

/// One task per connection: pump the session's outbound queue into the
/// socket, feed decoded inbound frames to the coordinator, and report the
/// disconnect when the stream ends either way.
async fn client_connected(socket: WebSocket, server: RoomServer, http: reqwest::Client) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    tokio::task::spawn(
        UnboundedReceiverStream::new(rx)
            .map(|frame| Ok(Message::text(frame)))
            .forward(ws_tx)
            .map(|result| {
                if let Err(e) = result {
                    log::debug!("websocket send error: {}", e);
                }
            }),
    );

    let session = server.connect(tx);
    while let Some(result) = ws_rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                log::debug!("websocket receive error on {}: {}", session.id(), e);
                break;
            }
        };
        let Ok(text) = message.to_str() else {
            continue;
        };
        let Ok(decoded) = serde_json::from_str::<ClientMessage>(text) else {
            log::debug!("dropping malformed frame from {}", session.id());
            continue;
        };
        match decoded {
            ClientMessage::QueueAdd { url } => queue_add(&server, &http, &session, &url).await,
            other => server.handle_message(session.id(), other),
        }
    }
    server.disconnect(session.id());
}

/// `queue:add` is the one message the engine cannot take raw: the URL is
/// resolved here and only resolved metadata crosses into the engine.
async fn queue_add(server: &RoomServer, http: &reqwest::Client, session: &Session, url: &str) {
    if !server.has_user(session.id()) {
        log::debug!("dropping queue:add from unjoined session {}", session.id());
        return;
    }
    match youtube::extract_video_id(url) {
        Some(youtube_id) => {
            let meta = youtube::fetch_metadata(http, &youtube_id).await;
            server.add_track(
                session.id(),
                NewTrack {
                    youtube_id,
                    title: meta.title,
                    thumbnail: meta.thumbnail,
                },
            );
        }
        None => {
            let error = ServerMessage::RoomError {
                message: "Invalid YouTube URL".to_owned(),
            };
            if let Some(frame) = hub::encode(&error) {
                let _ = session.deliver(&frame);
            }
        }
    }
}
