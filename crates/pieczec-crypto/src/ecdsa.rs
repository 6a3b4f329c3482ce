#![forbid(unsafe_code)]

//! ECDSA signature encodings.
//!
//! Signing primitives emit `SEQUENCE { INTEGER r, INTEGER s }` (DER), while
//! the `ecdsa-sha256` XML signature method carries the fixed-width
//! concatenation `r‖s`, each half left-padded to the curve's field size.

use pieczec_core::Error;

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// Field size of P-256 in bytes.
pub const P256_FIELD_SIZE: usize = 32;

/// Convert a DER ECDSA signature to raw `r‖s` of length `2 * key_size`.
pub fn der_to_raw(der: &[u8], key_size: usize) -> Result<Vec<u8>, Error> {
    if der.first() != Some(&TAG_SEQUENCE) {
        return Err(Error::InvalidDer("no SEQUENCE".into()));
    }
    // The SEQUENCE length is advisory: r and s are read from whatever
    // follows it, bounded by the input.
    let (len, content) = parse_length(&der[1..], "SEQUENCE")?;
    let body = &content[..len.min(content.len())];

    let (r, rest) = parse_integer(body, "r")?;
    let (s, _) = parse_integer(rest, "s")?;

    let mut raw = Vec::with_capacity(2 * key_size);
    raw.extend_from_slice(&left_pad(r, key_size, "r")?);
    raw.extend_from_slice(&left_pad(s, key_size, "s")?);
    Ok(raw)
}

/// Convert raw `r‖s` back to a DER `SEQUENCE { INTEGER r, INTEGER s }`.
pub fn raw_to_der(raw: &[u8]) -> Result<Vec<u8>, Error> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(Error::InvalidDer(format!(
            "raw signature length must be even and non-zero, got {}",
            raw.len()
        )));
    }
    let (r, s) = raw.split_at(raw.len() / 2);

    let mut body = encode_integer(r);
    body.extend_from_slice(&encode_integer(s));

    let mut der = vec![TAG_SEQUENCE];
    encode_length(body.len(), &mut der);
    der.extend_from_slice(&body);
    Ok(der)
}

/// Parse an ASN.1 length (short or long form), returning it with the bytes
/// that follow.
fn parse_length<'a>(data: &'a [u8], what: &str) -> Result<(usize, &'a [u8]), Error> {
    let first = *data
        .first()
        .ok_or_else(|| Error::InvalidDer(format!("truncated {what}")))?;
    if first < 0x80 {
        return Ok((first as usize, &data[1..]));
    }

    let count = (first & 0x7F) as usize;
    if count == 0 || count > std::mem::size_of::<usize>() {
        return Err(Error::InvalidDer(format!("unsupported length encoding for {what}")));
    }
    let bytes = data
        .get(1..1 + count)
        .ok_or_else(|| Error::InvalidDer(format!("truncated {what}")))?;
    let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Ok((len, &data[1 + count..]))
}

/// Parse an INTEGER, returning its magnitude without leading zero bytes.
/// The content must fit in `data`.
fn parse_integer<'a>(data: &'a [u8], name: &str) -> Result<(&'a [u8], &'a [u8]), Error> {
    if data.first() != Some(&TAG_INTEGER) {
        return Err(Error::InvalidDer(format!("expected INTEGER ({name})")));
    }
    let (len, rest) = parse_length(&data[1..], &format!("INTEGER ({name})"))?;
    if rest.len() < len {
        return Err(Error::InvalidDer(format!("truncated INTEGER ({name})")));
    }
    let (content, rest) = rest.split_at(len);
    let start = content.iter().position(|b| *b != 0).unwrap_or(content.len());
    Ok((&content[start..], rest))
}

fn left_pad(value: &[u8], size: usize, name: &str) -> Result<Vec<u8>, Error> {
    if value.len() > size {
        return Err(Error::InvalidDer(format!(
            "INTEGER ({name}) is {} bytes, exceeds key size {size}",
            value.len()
        )));
    }
    let mut out = vec![0u8; size - value.len()];
    out.extend_from_slice(value);
    Ok(out)
}

/// Minimal INTEGER encoding of an unsigned big-endian magnitude.
fn encode_integer(magnitude: &[u8]) -> Vec<u8> {
    let start = magnitude.iter().position(|b| *b != 0).unwrap_or(magnitude.len());
    let trimmed = &magnitude[start..];

    let mut content = Vec::with_capacity(trimmed.len() + 1);
    match trimmed.first() {
        None => content.push(0),
        Some(b) if b & 0x80 != 0 => {
            content.push(0);
            content.extend_from_slice(trimmed);
        }
        Some(_) => content.extend_from_slice(trimmed),
    }

    let mut out = vec![TAG_INTEGER];
    encode_length(content.len(), &mut out);
    out.extend_from_slice(&content);
    out
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    out.push(0x80 | (bytes.len() - start) as u8);
    out.extend_from_slice(&bytes[start..]);
}
