//! Reply reader
//!
//! Reads one complete FTP reply from a buffered stream. Replies may span
//! several reads and several lines; multi-line replies (`NNN-` ... `NNN `)
//! are reassembled before returning.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{FtpClientError, FtpResult, ProtocolError};
use crate::protocol::reply::{Reply, is_final_line, parse_code};

/// Reads a complete reply of at most `max_len` bytes.
///
/// # Errors
///
/// * `PeerClosed` - the stream ended before or inside a reply
/// * `Protocol(ReplyTooLong)` - the reply does not fit in `max_len` bytes
/// * `Protocol(InvalidReplyCode)` - the first line carries no status code
pub async fn read_reply<R>(reader: &mut R, max_len: usize) -> FtpResult<Reply>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut raw: Vec<u8> = Vec::new();
    let mut opening: Option<u16> = None;

    loop {
        let line_start = raw.len();
        let remaining = max_len.saturating_sub(raw.len()) as u64;

        // One byte past the limit is enough to tell overflow from a fit.
        let n = (&mut *reader)
            .take(remaining + 1)
            .read_until(b'\n', &mut raw)
            .await?;

        if raw.len() > max_len {
            return Err(ProtocolError::ReplyTooLong(max_len).into());
        }
        if n == 0 || !raw.ends_with(b"\n") {
            return Err(FtpClientError::PeerClosed);
        }

        let line = trim_line_end(&raw[line_start..]);
        match opening {
            None => {
                let code = parse_code(line)?;
                let multi_line = line.get(3) == Some(&b'-');
                if !multi_line {
                    return Ok(Reply::new(code, String::from_utf8_lossy(&raw)));
                }
                opening = Some(code);
            }
            Some(code) => {
                if is_final_line(line, code) {
                    return Ok(Reply::new(code, String::from_utf8_lossy(&raw)));
                }
            }
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_single_line_reply() {
        let mut input: &[u8] = b"220 Welcome to vsFTPd\r\n";
        let reply = read_reply(&mut input, 1024).await.unwrap();
        assert_eq!(reply.code(), 220);
        assert_eq!(reply.text(), "220 Welcome to vsFTPd\r\n");
    }

    #[tokio::test]
    async fn test_reads_only_one_reply() {
        let mut input: &[u8] = b"150 Here comes the listing\r\n226 Directory send OK\r\n";
        let first = read_reply(&mut input, 1024).await.unwrap();
        let second = read_reply(&mut input, 1024).await.unwrap();
        assert_eq!(first.code(), 150);
        assert_eq!(second.code(), 226);
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn test_multi_line_reply_split_across_reads() {
        let mock = Builder::new()
            .read(b"211-Features:\r\n AUTH T")
            .read(b"LS\r\n PBSZ\r\n211")
            .read(b" End\r\n")
            .build();
        let mut reader = BufReader::new(mock);
        let reply = read_reply(&mut reader, 1024).await.unwrap();
        assert_eq!(reply.code(), 211);
        assert_eq!(
            reply.text(),
            "211-Features:\r\n AUTH TLS\r\n PBSZ\r\n211 End\r\n"
        );
    }

    #[tokio::test]
    async fn test_multi_line_ignores_other_codes() {
        let mut input: &[u8] = b"230-Banner\r\n200 not the end\r\n230 Login successful.\r\n";
        let reply = read_reply(&mut input, 1024).await.unwrap();
        assert_eq!(reply.code(), 230);
        assert!(reply.text().ends_with("230 Login successful.\r\n"));
    }

    #[tokio::test]
    async fn test_peer_closed_before_reply() {
        let mut input: &[u8] = b"";
        let err = read_reply(&mut input, 1024).await.unwrap_err();
        assert!(matches!(err, FtpClientError::PeerClosed));
    }

    #[tokio::test]
    async fn test_peer_closed_mid_reply() {
        let mut input: &[u8] = b"211-Features:\r\n UTF8\r\n";
        let err = read_reply(&mut input, 1024).await.unwrap_err();
        assert!(matches!(err, FtpClientError::PeerClosed));

        let mut input: &[u8] = b"220 no terminator";
        let err = read_reply(&mut input, 1024).await.unwrap_err();
        assert!(matches!(err, FtpClientError::PeerClosed));
    }

    #[tokio::test]
    async fn test_reply_too_long() {
        let long = format!("220 {}\r\n", "x".repeat(64));
        let mut input = long.as_bytes();
        let err = read_reply(&mut input, 32).await.unwrap_err();
        assert!(matches!(
            err,
            FtpClientError::Protocol(ProtocolError::ReplyTooLong(32))
        ));
    }

    #[tokio::test]
    async fn test_reply_exactly_at_limit() {
        let mut input: &[u8] = b"200 OK\r\n";
        let reply = read_reply(&mut input, 8).await.unwrap();
        assert_eq!(reply.code(), 200);
    }

    #[tokio::test]
    async fn test_invalid_reply_code() {
        let mut input: &[u8] = b"hello there\r\n";
        let err = read_reply(&mut input, 1024).await.unwrap_err();
        assert!(matches!(
            err,
            FtpClientError::Protocol(ProtocolError::InvalidReplyCode(_))
        ));
    }

    #[tokio::test]
    async fn test_accepts_bare_line_feed() {
        let mut input: &[u8] = b"200 PBSZ=0\n";
        let reply = read_reply(&mut input, 1024).await.unwrap();
        assert_eq!(reply.code(), 200);
    }
}
