//! Terminal PIN prompt

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use twitter_auth::{Error, PinSource, Result};

/// Prints the authorization URL and reads the PIN from a line of input.
pub struct ConsolePin<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsolePin<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Prompt on stdout and read from stdin.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsolePin<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    async fn prompt(&self, authorize_url: &str) -> Result<String> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        let prompt = format!("Please go here and authorize: {authorize_url}\nPaste the PIN here: ");
        writer
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| Error::PinUnavailable(format!("writing prompt: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::PinUnavailable(format!("writing prompt: {e}")))?;

        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| Error::PinUnavailable(format!("reading PIN: {e}")))?;
        if read == 0 {
            return Err(Error::PinUnavailable("input closed before a PIN was entered".into()));
        }
        Ok(line.trim().to_string())
    }
}

impl<R, W> PinSource for ConsolePin<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn request_pin<'a>(
        &'a self,
        authorize_url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.prompt(authorize_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prints_url_and_reads_trimmed_pin() {
        let input: &[u8] = b"  1234567 \n";
        let pin = ConsolePin::new(input, Vec::new());

        let got = pin
            .request_pin("https://api.twitter.com/oauth/authorize?oauth_token=rt")
            .await
            .unwrap();
        assert_eq!(got, "1234567");

        let (_, output) = pin.io.into_inner();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("https://api.twitter.com/oauth/authorize?oauth_token=rt"));
    }

    #[tokio::test]
    async fn closed_input_is_unavailable() {
        let input: &[u8] = b"";
        let pin = ConsolePin::new(input, Vec::new());
        let err = pin.request_pin("https://x").await.unwrap_err();
        assert!(matches!(err, Error::PinUnavailable(_)));
    }
}
