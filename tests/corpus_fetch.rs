use std::io::{Cursor, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use dailypoem::corpus_store::{CorpusStore, DEFAULT_CORPUS_DIR_NAME};
use dailypoem::error::PoemError;
use dailypoem::loader;

const TANG_POEMS: &str = r#"[
  {"title": "静夜思", "author": "李白", "paragraphs": ["床前明月光，疑是地上霜。", "举头望明月，低头思故乡。"]}
]"#;

fn build_archive(files: &[(&str, &str)]) -> anyhow::Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in files {
        zip.start_file(*name, options)?;
        zip.write_all(contents.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

struct ArchiveServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    shutdown_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl ArchiveServer {
    fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.join();
    }
}

fn spawn_archive_server(archive: Vec<u8>) -> ArchiveServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let hits = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let server_hits = Arc::clone(&hits);
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };
            server_hits.fetch_add(1, Ordering::SeqCst);

            let response = match request.url() {
                "/poetry.zip" => tiny_http::Response::from_data(archive.clone()),
                "/corrupt.zip" => {
                    tiny_http::Response::from_data(b"PK\x03\x04 definitely not a zip".to_vec())
                }
                _ => tiny_http::Response::from_data(b"not found".to_vec()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    ArchiveServer {
        base_url,
        hits,
        shutdown_tx,
        handle,
    }
}

#[test]
fn downloads_and_extracts_once() -> anyhow::Result<()> {
    let archive = build_archive(&[
        ("chinese-poetry-master/README.md", "chinese-poetry"),
        ("chinese-poetry-master/全唐诗/poet.tang.0.json", TANG_POEMS),
        ("chinese-poetry-master/全唐诗/authors.tang.json", "[]"),
    ])?;
    let server = spawn_archive_server(archive);
    let temp = tempfile::TempDir::new()?;
    let data_dir = temp.path().join("data");

    let store = CorpusStore::new(
        &data_dir,
        DEFAULT_CORPUS_DIR_NAME,
        format!("{}/poetry.zip", server.base_url),
    );
    assert!(!store.is_available());

    let corpus_dir = store.ensure_available()?;
    assert_eq!(corpus_dir, data_dir.join(DEFAULT_CORPUS_DIR_NAME));
    assert!(corpus_dir.join("全唐诗").join("poet.tang.0.json").is_file());
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);

    // Only the corpus remains; download and staging leftovers are gone.
    let leftovers: Vec<_> = std::fs::read_dir(&data_dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<_, _>>()?;
    assert_eq!(leftovers, vec![std::ffi::OsString::from(DEFAULT_CORPUS_DIR_NAME)]);

    let hits = Arc::clone(&server.hits);
    server.stop();

    let again = store.ensure_available()?;
    assert_eq!(again, corpus_dir);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let corpus = loader::load(&corpus_dir);
    assert_eq!(corpus.len(), 1);
    Ok(())
}

#[test]
fn refresh_replaces_existing_corpus() -> anyhow::Result<()> {
    let archive = build_archive(&[("chinese-poetry-master/宋词/ci.song.0.json", TANG_POEMS)])?;
    let server = spawn_archive_server(archive);
    let temp = tempfile::TempDir::new()?;

    let store = CorpusStore::new(
        temp.path(),
        DEFAULT_CORPUS_DIR_NAME,
        format!("{}/poetry.zip", server.base_url),
    );
    std::fs::create_dir_all(store.corpus_dir().join("old"))?;
    std::fs::write(store.corpus_dir().join("old").join("tang.stale.json"), "[]")?;

    store.refresh()?;
    server.stop();

    assert!(!store.corpus_dir().join("old").exists());
    assert!(store.corpus_dir().join("宋词").join("ci.song.0.json").is_file());
    Ok(())
}

#[test]
fn http_error_is_fetch_error_and_leaves_nothing_behind() -> anyhow::Result<()> {
    let server = spawn_archive_server(Vec::new());
    let temp = tempfile::TempDir::new()?;
    let store = CorpusStore::new(
        temp.path(),
        DEFAULT_CORPUS_DIR_NAME,
        format!("{}/missing.zip", server.base_url),
    );

    let err = store.ensure_available().unwrap_err();
    server.stop();

    assert!(matches!(err, PoemError::Fetch { .. }), "{err}");
    assert!(err.to_string().contains("404"), "{err}");
    assert!(!store.is_available());
    assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
    Ok(())
}

#[test]
fn corrupt_archive_is_extract_error_and_not_available() -> anyhow::Result<()> {
    let server = spawn_archive_server(Vec::new());
    let temp = tempfile::TempDir::new()?;
    let store = CorpusStore::new(
        temp.path(),
        DEFAULT_CORPUS_DIR_NAME,
        format!("{}/corrupt.zip", server.base_url),
    );

    let err = store.ensure_available().unwrap_err();
    server.stop();

    assert!(matches!(err, PoemError::Extract { .. }), "{err}");
    assert!(!store.is_available());
    assert_eq!(std::fs::read_dir(temp.path())?.count(), 0);
    Ok(())
}

#[test]
fn leftovers_from_interrupted_fetch_are_swept() -> anyhow::Result<()> {
    let archive = build_archive(&[("chinese-poetry-master/宋词/ci.song.0.json", TANG_POEMS)])?;
    let server = spawn_archive_server(archive);
    let temp = tempfile::TempDir::new()?;

    let staging = temp.path().join(".corpus-staging-abc123");
    std::fs::create_dir_all(staging.join("unpacked").join("chinese-poetry-master"))?;
    std::fs::write(
        staging.join("unpacked").join("chinese-poetry-master").join("half.json"),
        "[",
    )?;
    std::fs::write(temp.path().join(".corpus-download-def456.zip"), b"PK\x03\x04")?;
    std::fs::create_dir_all(temp.path().join(".corpus-old-0011"))?;
    std::fs::write(temp.path().join("history.log"), "kept\n")?;

    let store = CorpusStore::new(
        temp.path(),
        DEFAULT_CORPUS_DIR_NAME,
        format!("{}/poetry.zip", server.base_url),
    );
    store.ensure_available()?;
    server.stop();

    let mut names: Vec<_> = std::fs::read_dir(temp.path())?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<_, _>>()?;
    names.sort();
    assert_eq!(
        names,
        vec![
            std::ffi::OsString::from(DEFAULT_CORPUS_DIR_NAME),
            std::ffi::OsString::from("history.log"),
        ]
    );
    Ok(())
}
