use super::*;
use std::io::Write;

#[derive(Debug, Deserialize, PartialEq)]
struct Row {
    name: String,
    count: usize,
}

#[test]
fn read_table_tsv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rows.tsv");
    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "name\tcount\nA\t1\nB\t2")?;

    let rows: Vec<Row> = read_table(&path)?;
    let expected = vec![Row { name: "A".into(), count: 1 }, Row { name: "B".into(), count: 2 }];
    assert_eq!(rows, expected);
    Ok(())
}

#[test]
fn read_table_compressed_csv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rows.csv.zst");
    let compressed = zstd::encode_all("name,count\nA,3\n".as_bytes(), 0)?;
    std::fs::write(&path, compressed)?;

    let rows: Vec<Row> = read_table(&path)?;
    assert_eq!(rows, vec![Row { name: "A".into(), count: 3 }]);
    Ok(())
}

#[test]
fn read_table_type_error_names_source() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("rows.tsv");
    std::fs::write(&path, "name\tcount\nA\tmany\n")?;

    let error = read_table::<Row, _>(&path).unwrap_err();
    assert!(format!("{error:?}").contains("rows.tsv"));
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() {
    assert!(get_delimiter(&"rows.xlsx").is_err());
    assert!(get_delimiter(&"rows.xlsx.zst").is_err());
}

#[test]
fn fetch_default_has_no_retries() {
    let fetch = Fetch::default();
    assert_eq!(fetch.retries, 0);
    assert_eq!(fetch.timeout, 30);
}

/// Serves one canned HTTP response per connection, in order, and returns the URL.
#[cfg(feature = "download")]
fn serve(responses: Vec<(u16, &'static str)>) -> Result<String, Report> {
    use std::io::Read;

    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}/data.zip", listener.local_addr()?);
    std::thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else { return };
            let mut request = Vec::new();
            let mut buffer = [0; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buffer[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {status} Status\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    Ok(url)
}

#[cfg(feature = "download")]
#[test]
fn fetch_retries_server_error() -> Result<(), Report> {
    let url = serve(vec![(500, ""), (200, "archive")])?;
    let fetch = Fetch { timeout: 5, retries: 1 };
    let text = tokio_test::block_on(fetch.text(&url))?;
    assert_eq!(text, "archive");
    Ok(())
}

#[cfg(feature = "download")]
#[test]
fn fetch_server_error_without_retries() -> Result<(), Report> {
    let url = serve(vec![(500, "")])?;
    let error = tokio_test::block_on(Fetch::default().text(&url)).unwrap_err();
    assert!(error.to_string().contains("Failed to download"));
    Ok(())
}
