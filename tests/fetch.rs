use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use image_harvest::error::FetchError;
use image_harvest::fetch::{BROWSER_USER_AGENT, Fetcher, HttpFetcher};

fn destination(temp: &tempfile::TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join(name)).unwrap()
}

fn leftover_files(temp: &tempfile::TempDir) -> usize {
    std::fs::read_dir(temp.path()).unwrap().count()
}

#[tokio::test(flavor = "multi_thread")]
async fn streams_body_to_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat.jpg"))
        .and(header("user-agent", BROWSER_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xff\xd8jpegbytes".to_vec()))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let dest = destination(&temp, "abc.jpg");
    let url = format!("{}/cat.jpg", server.uri());
    let target = dest.clone();
    let written = tokio::task::spawn_blocking(move || {
        HttpFetcher::new().unwrap().fetch(&url, &target)
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(written, 11);
    assert_eq!(std::fs::read(dest.as_std_path()).unwrap(), b"\xff\xd8jpegbytes");
    assert_eq!(leftover_files(&temp), 1);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = |path: &std::path::Path| {
            std::fs::metadata(path).unwrap().permissions().mode() & 0o777
        };
        let plain = temp.path().join("plain.jpg");
        std::fs::write(&plain, b"x").unwrap();
        assert_eq!(mode(dest.as_std_path()), mode(&plain));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let dest = destination(&temp, "gone.png");
    let url = format!("{}/gone.png", server.uri());
    let target = dest.clone();
    let result = tokio::task::spawn_blocking(move || {
        HttpFetcher::new().unwrap().fetch(&url, &target)
    })
    .await
    .unwrap();

    assert_eq!(result, Err(FetchError::HttpStatus(404)));
    assert!(!dest.exists());
    assert_eq!(leftover_files(&temp), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().unwrap();
    let dest = destination(&temp, "slow.jpg");
    let url = format!("{}/slow.jpg", server.uri());
    let target = dest.clone();
    let result = tokio::task::spawn_blocking(move || {
        HttpFetcher::with_timeout(Duration::from_millis(200))
            .unwrap()
            .fetch(&url, &target)
    })
    .await
    .unwrap();

    assert_eq!(result, Err(FetchError::Timeout));
    assert!(!dest.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_host_is_a_transport_error() {
    let temp = tempfile::tempdir().unwrap();
    let dest = destination(&temp, "x.jpg");
    let target = dest.clone();
    let result = tokio::task::spawn_blocking(move || {
        HttpFetcher::new()
            .unwrap()
            .fetch("http://127.0.0.1:1/x.jpg", &target)
    })
    .await
    .unwrap();

    assert_matches!(result, Err(FetchError::Transport(_)));
    assert!(!dest.exists());
}
