//! Integration tests for cache-pull

mod support {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use std::fs;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};
    use std::thread::{self, JoinHandle};
    use tempfile::TempDir;

    /// Scratch directory with an empty config file and an output root
    pub struct Fixture {
        pub dir: TempDir,
    }

    impl Fixture {
        pub fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("config.toml"), "").unwrap();
            Self { dir }
        }

        pub fn out(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        pub fn write_archive(&self, name: &str, bytes: &[u8]) -> String {
            let path = self.dir.path().join(name);
            fs::write(&path, bytes).unwrap();
            format!("file://{}", path.display())
        }

        pub fn cmd(&self) -> Command {
            self.cmd_with_config(&self.dir.path().join("config.toml"))
        }

        pub fn cmd_with_config(&self, config: &Path) -> Command {
            let mut cmd = cargo_bin_cmd!("cache-pull");
            for var in [
                "cache_api_url",
                "BITRISEIO_STACK_ID",
                "is_debug_mode",
                "CACHE_PULL_CONFIG",
                "HTTP_PROXY",
                "http_proxy",
                "HTTPS_PROXY",
                "https_proxy",
                "ALL_PROXY",
                "all_proxy",
            ] {
                cmd.env_remove(var);
            }
            cmd.arg("--config")
                .arg(config)
                .arg("--destination")
                .arg(self.out())
                .arg("--staging-path")
                .arg(self.dir.path().join("staged.tar"));
            cmd
        }

        pub fn entries(&self) -> usize {
            fs::read_dir(self.out()).map(|d| d.count()).unwrap_or(0)
        }
    }

    pub fn append_file(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut header, path, data).unwrap();
    }

    pub fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Gzipped archive, with `archive_info.json` first when `info` is set
    pub fn cache_archive(info: Option<&str>) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        if let Some(info) = info {
            append_file(&mut builder, "tmp/archive_info.json", info.as_bytes());
        }
        append_file(&mut builder, "home/.gradle/caches/modules.bin", &[5u8; 8192]);
        append_file(&mut builder, "home/.cocoapods/repos/spec.json", b"{\"pods\":[]}");
        gzip(&builder.into_inner().unwrap())
    }

    pub fn read(root: &Path, file: &str) -> Vec<u8> {
        fs::read(root.join(file)).unwrap()
    }

    /// Minimal HTTP server answering `requests` GETs from a route table
    pub struct Server {
        pub base: String,
        handle: JoinHandle<()>,
    }

    impl Server {
        pub fn start<F>(routes: F, requests: usize) -> Self
        where
            F: FnOnce(&str) -> Vec<(&'static str, u16, Vec<u8>)>,
        {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let routes = routes(&base);

            let handle = thread::spawn(move || {
                for stream in listener.incoming().take(requests) {
                    let mut stream = stream.unwrap();
                    let mut reader = BufReader::new(stream.try_clone().unwrap());

                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).unwrap();
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                            break;
                        }
                    }

                    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                    let (status, body) = routes
                        .iter()
                        .find(|(route, _, _)| *route == path)
                        .map(|(_, status, body)| (*status, body.clone()))
                        .unwrap_or((404, b"not found".to_vec()));

                    let head = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    stream.write_all(head.as_bytes()).unwrap();
                    stream.write_all(&body).unwrap();
                    stream.flush().unwrap();
                }
            });

            Self { base, handle }
        }

        pub fn join(self) {
            self.handle.join().unwrap();
        }
    }
}

mod cli_tests {
    use super::support::*;
    use predicates::prelude::*;

    #[test]
    fn help_displays() {
        Fixture::new()
            .cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("restore a CI build cache"));
    }

    #[test]
    fn version_displays() {
        Fixture::new()
            .cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache-pull"));
    }

    #[test]
    fn no_cache_url_is_not_an_error() {
        Fixture::new()
            .cmd()
            .assert()
            .success()
            .stdout(predicate::str::contains("No Cache API URL specified"));
    }

    #[test]
    fn missing_config_file_fails() {
        let fx = Fixture::new();
        fx.cmd_with_config(&fx.dir.path().join("nope.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn extracts_local_archive() {
        let fx = Fixture::new();
        let uri = fx.write_archive("cache.tar.gz", &cache_archive(None));

        fx.cmd()
            .args(["--cache-api-url", &uri])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using local cache archive"))
            .stdout(predicate::str::contains("Done"));

        assert_eq!(
            read(&fx.out(), "home/.gradle/caches/modules.bin"),
            vec![5u8; 8192]
        );
    }

    #[test]
    fn stack_id_from_environment() {
        let fx = Fixture::new();
        let uri = fx.write_archive(
            "cache.tar.gz",
            &cache_archive(Some(r#"{"stack_id":"osx-xcode"}"#)),
        );

        fx.cmd()
            .env("cache_api_url", &uri)
            .env("BITRISEIO_STACK_ID", "osx-xcode")
            .assert()
            .success()
            .stdout(predicate::str::contains("archive stack id: osx-xcode"));

        assert!(fx.out().join("home/.cocoapods/repos/spec.json").is_file());
    }

    #[test]
    fn stack_mismatch_skips_extraction() {
        let fx = Fixture::new();
        let uri = fx.write_archive(
            "cache.tar.gz",
            &cache_archive(Some(r#"{"stack_id":"osx-xcode"}"#)),
        );

        fx.cmd()
            .args(["--cache-api-url", &uri, "--stack-id", "linux-docker"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Skipping cache pull"));

        assert_eq!(fx.entries(), 0);
    }

    #[test]
    fn untagged_archive_is_extracted() {
        let fx = Fixture::new();
        let uri = fx.write_archive("cache.tar.gz", &cache_archive(None));

        fx.cmd()
            .args(["--cache-api-url", &uri, "--stack-id", "osx-xcode"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "does not contain stack information",
            ));

        assert!(fx.entries() > 0);
    }

    #[test]
    fn invalid_archive_info_fails() {
        let fx = Fixture::new();
        let uri = fx.write_archive("cache.tar.gz", &cache_archive(Some("{not json")));

        fx.cmd()
            .args(["--cache-api-url", &uri, "--stack-id", "osx-xcode"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse archive info"));

        assert_eq!(fx.entries(), 0);
    }

    #[test]
    fn both_tiers_failing_reports_both() {
        let fx = Fixture::new();
        let archive = cache_archive(None);
        let uri = fx.write_archive("cache.tar.gz", &archive[..archive.len() / 2]);

        fx.cmd()
            .args(["--cache-api-url", &uri, "--tar-command", "/nonexistent/tar"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fallback failed"))
            .stderr(predicate::str::contains("/nonexistent/tar"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[cfg(unix)]
    #[test]
    fn tar_fallback_handles_entries_streaming_rejects() {
        let fx = Fixture::new();
        let mut builder = tar::Builder::new(Vec::new());
        append_file(&mut builder, "cache/data.txt", b"kept");
        let mut header = tar::Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Fifo);
        builder.append_data(&mut header, "cache/pipe", &b""[..]).unwrap();
        let archive = gzip(&builder.into_inner().unwrap());
        let uri = fx.write_archive("cache.tar.gz", &archive);

        fx.cmd()
            .args(["--cache-api-url", &uri])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Failed to uncompress cache archive stream",
            ))
            .stdout(predicate::str::contains("fallback extractor"));

        assert_eq!(read(&fx.out(), "cache/data.txt"), b"kept");
    }
}

mod remote_tests {
    use super::support::*;
    use predicates::prelude::*;

    #[test]
    fn remote_and_local_archives_extract_identically() {
        let archive = cache_archive(Some(r#"{"stack_id":"osx-xcode"}"#));
        let served = archive.clone();
        let server = Server::start(
            move |base| {
                vec![
                    (
                        "/api/cache",
                        200,
                        format!(r#"{{"download_url":"{}/storage/cache.tar.gz"}}"#, base)
                            .into_bytes(),
                    ),
                    ("/storage/cache.tar.gz", 200, served),
                ]
            },
            2,
        );

        let remote = Fixture::new();
        remote
            .cmd()
            .args([
                "--cache-api-url",
                &format!("{}/api/cache", server.base),
                "--stack-id",
                "osx-xcode",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Downloading remote cache archive"));
        server.join();

        let local = Fixture::new();
        let uri = local.write_archive("cache.tar.gz", &archive);
        local
            .cmd()
            .args(["--cache-api-url", &uri, "--stack-id", "osx-xcode"])
            .assert()
            .success();

        for file in [
            "tmp/archive_info.json",
            "home/.gradle/caches/modules.bin",
            "home/.cocoapods/repos/spec.json",
        ] {
            assert_eq!(read(&remote.out(), file), read(&local.out(), file));
        }
    }

    #[test]
    fn cache_not_found_fails_with_hint() {
        let server = Server::start(|_| Vec::new(), 1);

        Fixture::new()
            .cmd()
            .args(["--cache-api-url", &format!("{}/api/cache", server.base)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build cache not found"))
            .stderr(predicate::str::contains("not initialised"));
        server.join();
    }

    #[test]
    fn download_error_status_fails() {
        let server = Server::start(
            |base| {
                vec![(
                    "/api/cache",
                    200,
                    format!(r#"{{"download_url":"{}/gone"}}"#, base).into_bytes(),
                )]
            },
            2,
        );

        Fixture::new()
            .cmd()
            .args(["--cache-api-url", &format!("{}/api/cache", server.base)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Non success response code"))
            .stderr(predicate::str::contains("404"));
        server.join();
    }

    #[test]
    fn partial_content_is_rejected() {
        let archive = cache_archive(None);
        let server = Server::start(
            move |base| {
                vec![
                    (
                        "/api/cache",
                        200,
                        format!(r#"{{"download_url":"{}/storage/cache.tar.gz"}}"#, base)
                            .into_bytes(),
                    ),
                    ("/storage/cache.tar.gz", 206, archive),
                ]
            },
            2,
        );

        let fx = Fixture::new();
        fx.cmd()
            .args(["--cache-api-url", &format!("{}/api/cache", server.base)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Non success response code"))
            .stderr(predicate::str::contains("206"));
        server.join();

        assert_eq!(fx.entries(), 0);
    }
}
