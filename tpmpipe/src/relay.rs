//! The relay loop and the single-shot sender.
//!
//! Both paths move opaque commands from an input stream to a
//! [`Transport`] and the responses to an output stream, single-threaded
//! and blocking. The streaming relay frames and primes; the single-shot
//! sender treats the whole input as one command.

use std::io::{Read, Write};

use tpmpipe_wire::{Encoding, Framer, write_lead_byte, write_message};

use crate::error::Result;
use crate::transport::Transport;

/// Relays framed commands from `input` to `tpm` and responses to `output`
/// until `input` reaches end-of-stream at a message boundary.
///
/// Each iteration primes `output` with the lead byte before blocking on
/// the next command, and forwards the response from its second byte, the
/// first having been covered by the primer. One final lead byte therefore
/// trails the last response when the session ends cleanly.
///
/// The command buffer is allocated once and reused for every message;
/// `max_message` bounds the total binary length a header may declare.
pub fn relay(
    input: &mut impl Read,
    output: &mut impl Write,
    tpm: &mut impl Transport,
    encoding: Encoding,
    max_message: usize,
) -> Result<()> {
    let mut framer = Framer::new(encoding, max_message);
    loop {
        write_lead_byte(output, encoding)?;
        let Some(command) = framer.read_message(input)? else {
            tracing::debug!("input closed, relay done");
            return Ok(());
        };
        tracing::debug!("command: {} bytes", command.len());
        let response = tpm.submit(command)?;
        tracing::debug!("response: {} bytes", response.len());
        write_message(output, response.get(1..).unwrap_or_default(), encoding)?;
    }
}

/// Submits one fully-buffered command and writes the complete response.
///
/// The whole of `input` is the command: it is read to end-of-stream into
/// a fresh buffer, submitted once, and the response written verbatim with
/// no lead byte. Hex mode applies to both directions; the hex input may
/// contain ASCII whitespace, since such payloads usually come from shells
/// and text files.
pub fn send_one(
    input: &mut impl Read,
    output: &mut impl Write,
    tpm: &mut impl Transport,
    encoding: Encoding,
) -> Result<()> {
    let mut raw = Vec::new();
    input
        .read_to_end(&mut raw)
        .map_err(tpmpipe_wire::Error::Read)?;

    let command = match encoding {
        Encoding::Binary => raw,
        Encoding::Hex => {
            raw.retain(|b| !b.is_ascii_whitespace());
            tpmpipe_wire::decode(&raw).map_err(tpmpipe_wire::Error::from)?
        }
    };
    tracing::debug!("command: {} bytes", command.len());
    let response = tpm.submit(&command)?;
    tracing::debug!("response: {} bytes", response.len());
    write_message(output, &response, encoding)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{Cursor, Seek, SeekFrom, Write as _};

    use tpmpipe_wire::{DEFAULT_MAX_MESSAGE, LEAD_BYTE};

    use super::*;
    use crate::error::Error;

    /// Transport double answering every command with a canned response.
    struct Scripted {
        response: Vec<u8>,
        submitted: Vec<Vec<u8>>,
    }

    impl Scripted {
        fn new(response: &[u8]) -> Self {
            Self {
                response: response.to_vec(),
                submitted: Vec::new(),
            }
        }
    }

    impl Transport for Scripted {
        fn submit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
            self.submitted.push(command.to_vec());
            Ok(self.response.clone())
        }
    }

    /// Transport double that always fails with a fixed status code.
    struct Failing(u32);

    impl Transport for Failing {
        fn submit(&mut self, _command: &[u8]) -> Result<Vec<u8>> {
            Err(Error::Transport {
                op: "submit_command",
                code: self.0,
            })
        }
    }

    /// Builds a message whose header declares `total` bytes, padded with
    /// a counting body to exactly `total` bytes.
    fn msg(total: u32) -> Vec<u8> {
        let mut m = vec![0x80, 0x01];
        m.extend_from_slice(&total.to_be_bytes());
        m.extend_from_slice(&[0x00, 0x00, 0x01, 0x44]);
        while m.len() < total as usize {
            m.push(m.len() as u8);
        }
        m
    }

    #[test]
    fn relays_response_behind_lead_byte() {
        let command = msg(14);
        let response = msg(16);
        let mut input = Cursor::new(command.clone());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap();

        assert_eq!(tpm.submitted, vec![command]);
        // Lead byte, response from its second byte, then the primer for
        // the exchange that never came.
        let mut expected = vec![LEAD_BYTE];
        expected.extend_from_slice(&response[1..]);
        expected.push(LEAD_BYTE);
        assert_eq!(output, expected);
    }

    #[test]
    fn relays_commands_back_to_back() {
        let (a, b) = (msg(12), msg(32));
        let response = msg(11);
        let mut stream = a.clone();
        stream.extend_from_slice(&b);
        let mut input = Cursor::new(stream);
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap();

        assert_eq!(tpm.submitted, vec![a, b]);

        let mut expected = vec![LEAD_BYTE];
        expected.extend_from_slice(&response[1..]);
        expected.push(LEAD_BYTE);
        expected.extend_from_slice(&response[1..]);
        expected.push(LEAD_BYTE);
        assert_eq!(output, expected);
    }

    #[test]
    fn empty_input_is_a_clean_session() {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&msg(10));

        relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap();

        assert!(tpm.submitted.is_empty());
        assert_eq!(output, vec![LEAD_BYTE]);
    }

    #[test]
    fn transport_failure_carries_its_status_code() {
        let mut input = Cursor::new(msg(12));
        let mut output = Vec::new();
        let mut tpm = Failing(0x8028_4001);

        let err = relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Transport {
                code: 0x8028_4001,
                ..
            }
        ));
        // The primer went out before the command read; no response did.
        assert_eq!(output, vec![LEAD_BYTE]);
    }

    #[test]
    fn truncated_command_aborts_the_relay() {
        let mut input = Cursor::new(msg(14)[..6].to_vec());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&msg(10));

        let err = relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Wire(tpmpipe_wire::Error::Truncated { .. })
        ));
        assert!(tpm.submitted.is_empty());
    }

    #[test]
    fn hex_session_is_hex_in_both_directions() {
        let command = msg(12);
        let response = msg(13);
        let mut input = Cursor::new(tpmpipe_wire::encode(&command).into_bytes());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Hex,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap();

        // The transport always sees binary regardless of stream encoding.
        assert_eq!(tpm.submitted, vec![command]);

        let mut expected = String::from("80");
        expected.push_str(&tpmpipe_wire::encode(&response[1..]));
        expected.push_str("80");
        assert_eq!(output, expected.into_bytes());
    }

    #[test]
    fn empty_response_forwards_nothing_after_the_primer() {
        let mut input = Cursor::new(msg(10));
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&[]);

        relay(
            &mut input,
            &mut output,
            &mut tpm,
            Encoding::Binary,
            DEFAULT_MAX_MESSAGE,
        )
        .unwrap();

        assert_eq!(output, vec![LEAD_BYTE, LEAD_BYTE]);
    }

    #[test]
    fn send_one_writes_the_response_verbatim() {
        let command = msg(14);
        let response = msg(24);
        let mut input = Cursor::new(command.clone());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        send_one(&mut input, &mut output, &mut tpm, Encoding::Binary).unwrap();

        assert_eq!(tpm.submitted, vec![command]);
        // No lead byte, no trimming: the response exactly.
        assert_eq!(output, response);
    }

    #[test]
    fn send_one_hex_tolerates_whitespace() {
        let command = msg(10);
        let response = msg(12);
        let text = "8001 0000 000a\n0000 0144\n";
        let mut input = Cursor::new(text.as_bytes().to_vec());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        send_one(&mut input, &mut output, &mut tpm, Encoding::Hex).unwrap();

        assert_eq!(tpm.submitted, vec![command]);
        assert_eq!(output, tpmpipe_wire::encode(&response).into_bytes());
    }

    #[test]
    fn send_one_rejects_bad_hex() {
        let mut input = Cursor::new(b"80zz".to_vec());
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&msg(10));

        let err = send_one(&mut input, &mut output, &mut tpm, Encoding::Hex).unwrap_err();
        assert!(matches!(
            err,
            Error::Wire(tpmpipe_wire::Error::Hex(_))
        ));
        assert!(output.is_empty());
    }

    #[test]
    fn send_one_reads_a_real_file() {
        let command = msg(18);
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&command).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let response = msg(10);
        let mut output = Vec::new();
        let mut tpm = Scripted::new(&response);

        send_one(&mut file, &mut output, &mut tpm, Encoding::Binary).unwrap();

        assert_eq!(tpm.submitted, vec![command]);
        assert_eq!(output, response);
    }
}
