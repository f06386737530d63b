use encoding_rs::{Decoder, DecoderResult, Encoding};
use std::io::{self, Read};

const INPUT_BUFFER_SIZE: usize = 8192 * 8;
const OUTPUT_BUFFER_SIZE: usize = 8192 * 16;

/// Streaming transcoder from a legacy text encoding into UTF-8.
///
/// Bytes are decoded in fixed-size windows so a multi-gigabyte export never
/// has to be held in memory just to change its encoding. A byte sequence that
/// is invalid in the source encoding surfaces as `InvalidData`.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    encoding: &'static Encoding,
    input: Vec<u8>,
    input_start: usize,
    input_end: usize,
    output: Vec<u8>,
    output_start: usize,
    output_end: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_with_bom_removal(),
            encoding,
            input: vec![0; INPUT_BUFFER_SIZE],
            input_start: 0,
            input_end: 0,
            output: vec![0; OUTPUT_BUFFER_SIZE],
            output_start: 0,
            output_end: 0,
            eof: false,
            finished: false,
        }
    }

    fn fill_output(&mut self) -> io::Result<()> {
        if self.input_start == self.input_end && !self.eof {
            let read = self.inner.read(&mut self.input)?;
            self.input_start = 0;
            self.input_end = read;
            self.eof = read == 0;
        }

        let (result, read, written) = self.decoder.decode_to_utf8_without_replacement(
            &self.input[self.input_start..self.input_end],
            &mut self.output,
            self.eof,
        );
        self.input_start += read;
        self.output_start = 0;
        self.output_end = written;

        match result {
            DecoderResult::InputEmpty => {
                if self.eof {
                    self.finished = true;
                }
                Ok(())
            }
            DecoderResult::OutputFull => Ok(()),
            DecoderResult::Malformed(_, _) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("malformed {} byte sequence", self.encoding.name()),
            )),
        }
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.output_start < self.output_end {
                let available = self.output_end - self.output_start;
                let n = available.min(buf.len());
                buf[..n].copy_from_slice(&self.output[self.output_start..self.output_start + n]);
                self.output_start += n;
                return Ok(n);
            }

            if self.finished || buf.is_empty() {
                return Ok(0);
            }

            self.fill_output()?;
        }
    }
}

/// Resolve a WHATWG encoding label such as `ISO-8859-1` or `utf-8`.
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}
