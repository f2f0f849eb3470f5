#![cfg(feature = "remote")]

//! Upload client against a local tiny_http API

use resume_export::{Error, PackagedFile, UploadClient};
use std::io::Read;
use std::sync::mpsc;
use tiny_http::{Header, Response, Server};

struct Seen {
    method: String,
    url: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

/// Serve one request with `status` and `body`, reporting what was received
fn one_shot_api(status: u16, body: &'static str) -> (String, mpsc::Receiver<Seen>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        if let Ok(mut request) = server.recv() {
            let header = |name: &str| {
                request
                    .headers()
                    .iter()
                    .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
                    .map(|h| h.value.as_str().to_string())
            };
            let authorization = header("Authorization");
            let content_type = header("Content-Type");
            let mut raw = Vec::new();
            let _ = request.as_reader().read_to_end(&mut raw);
            let seen = Seen {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                content_type,
                body: String::from_utf8_lossy(&raw).into_owned(),
            };
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header("Content-Type: application/json".parse::<Header>().unwrap());
            let _ = request.respond(response);
            let _ = tx.send(seen);
        }
    });

    (format!("http://{}", addr), rx)
}

fn png(name: &str) -> PackagedFile {
    PackagedFile {
        name: name.to_string(),
        mime: "image/png".to_string(),
        bytes: b"\x89PNG\r\n\x1a\nfake".to_vec(),
    }
}

#[tokio::test]
async fn sends_both_parts_with_bearer_auth() {
    let (base, rx) = one_shot_api(
        200,
        r#"{"message":"Images uploaded successfully","thumbnailLink":"http://api/uploads/t.png","profilePreviewUrl":"http://api/uploads/p.png"}"#,
    );
    let client = UploadClient::new(base, "secret-token").unwrap();
    let resp = client
        .upload_resume_images("64ab", Some(&png("thumbnail.png")), Some(&png("profile.png")))
        .await
        .unwrap();
    assert_eq!(resp.message, "Images uploaded successfully");
    assert_eq!(resp.thumbnail_link.as_deref(), Some("http://api/uploads/t.png"));
    assert_eq!(resp.profile_preview_url.as_deref(), Some("http://api/uploads/p.png"));

    let seen = rx.recv().unwrap();
    assert_eq!(seen.method, "PUT");
    assert_eq!(seen.url, "/api/resume/64ab/upload-images");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer secret-token"));
    assert!(seen.content_type.unwrap_or_default().starts_with("multipart/form-data"));
    assert!(seen.body.contains(r#"name="thumbnail"; filename="thumbnail.png""#));
    assert!(seen.body.contains(r#"name="profileImage"; filename="profile.png""#));
    assert!(seen.body.contains("image/png"));
}

#[tokio::test]
async fn thumbnail_only() {
    let (base, rx) = one_shot_api(200, r#"{"message":"Images uploaded successfully"}"#);
    let client = UploadClient::new(base, "t").unwrap();
    client
        .upload_resume_images("1", Some(&png("thumbnail.png")), None)
        .await
        .unwrap();
    let seen = rx.recv().unwrap();
    assert!(seen.body.contains(r#"name="thumbnail""#));
    assert!(!seen.body.contains("profileImage"));
}

#[tokio::test]
async fn not_found_surfaces_as_upload_error() {
    let (base, _rx) = one_shot_api(404, r#"{"message":"Resume not found or unauthorised"}"#);
    let client = UploadClient::new(base, "t").unwrap();
    let err = client
        .upload_resume_images("missing", Some(&png("thumbnail.png")), None)
        .await
        .unwrap_err();
    match err {
        Error::UploadError { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Resume not found or unauthorised");
        }
        other => panic!("unexpected {:?}", other),
    }
}
