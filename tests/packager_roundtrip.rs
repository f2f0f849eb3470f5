//! Captured images survive packaging for upload

use resume_export::{data_url_to_file, CaptureDriver, Document, Error, ExportConfig, RasterImage};

#[tokio::test]
async fn capture_to_file_and_back() {
    let driver = CaptureDriver::new(ExportConfig {
        scale: 1.0,
        ..ExportConfig::default()
    })
    .unwrap();
    let mut doc = Document::parse(r#"<body><div id="card" style="width: 20px; height: 8px">ok</div></body>"#);
    let target = doc.query_selector("#card").unwrap();

    let image: RasterImage = driver.capture_element(&mut doc, target).await.unwrap();
    let file = data_url_to_file(&image.data_uri, "thumbnail.png").unwrap();
    assert_eq!(file.mime, "image/png");
    assert_eq!(file.to_data_url(), image.data_uri);

    let decoded = tiny_skia::Pixmap::decode_png(&file.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (image.width, image.height));
    assert_eq!((image.width, image.height), (20, 8));
}

#[test]
fn lenient_header_strict_payload() {
    // no `;` closing the MIME type
    let f = data_url_to_file("data:image/gif,AQID", "blob").unwrap();
    assert_eq!(f.mime, "image/png");

    let f = data_url_to_file(",AQID", "blob").unwrap();
    assert_eq!(f.mime, "image/png");
    assert_eq!(f.bytes, vec![1, 2, 3]);

    let err = data_url_to_file("data:image/png;base64,not base64!", "blob").unwrap_err();
    assert!(matches!(err, Error::MalformedPayload(_)));
}
