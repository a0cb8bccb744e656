//! Character encoding utilities for RTF input and rendered output.
//!
//! RTF text reaches the converter as raw bytes in a document- or font-level
//! codepage, as `\'xx` escapes resolved through the same codepage, or as
//! `\uN` escapes that bypass codepages entirely. This module maps RTF codepage
//! and charset identifiers onto `encoding_rs` encodings and provides the
//! decode/encode primitives the parser and the output writer share.
//!
//! Every function here is pure: the active codepage and replacement policy are
//! passed in by the caller.

use encoding_rs::{EncoderResult, Encoding};
use std::borrow::Cow;
use thiserror::Error;

/// RTF `\fcharset` value of the Symbol font.
pub const SYMBOL_CHARSET: i32 = 2;

/// Codepage assumed when a document declares none (`\ansi`).
pub const DEFAULT_CODEPAGE: u32 = 1252;

/// Failure to move text between the Unicode and a byte encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Input bytes are malformed in the declared source encoding.
    #[error("byte sequence is not valid {encoding}")]
    Undecodable {
        /// Name of the source encoding
        encoding: &'static str,
    },

    /// A character has no representation in the target encoding.
    #[error("character U+{codepoint:04X} is not representable in {encoding}")]
    Unencodable {
        /// Name of the target encoding
        encoding: &'static str,
        /// The offending code point
        codepoint: u32,
    },
}

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// Returns `None` for codepages `encoding_rs` cannot represent, most notably
/// the DOS codepages 437 and 850 used by `\pc` and `\pca`.
///
/// # Examples
/// ```
/// use unrtf::common::encoding::codepage_to_encoding;
///
/// let encoding = codepage_to_encoding(936).unwrap();
/// assert_eq!(encoding.name(), "GBK");
/// ```
#[inline]
pub fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    match codepage {
        // Windows codepages (Western scripts)
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European (default ANSI)
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // DOS Cyrillic
        866 => Some(encoding_rs::IBM866),

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS), // Japanese Shift-JIS
        936 => Some(encoding_rs::GBK),       // Simplified Chinese (GB2312/GBK)
        949 => Some(encoding_rs::EUC_KR),    // Korean
        950 => Some(encoding_rs::BIG5),      // Traditional Chinese (Big5)
        20932 => Some(encoding_rs::EUC_JP),  // Japanese EUC-JP
        20936 => Some(encoding_rs::GBK),     // GB2312
        54936 => Some(encoding_rs::GB18030), // Chinese GB18030 (superset of GBK)

        // ISO 8859 series
        28591 => Some(encoding_rs::WINDOWS_1252), // ISO-8859-1 approximation
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6),
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28603 => Some(encoding_rs::ISO_8859_13),
        28605 => Some(encoding_rs::ISO_8859_15),

        // KOI8 series
        20866 => Some(encoding_rs::KOI8_R),
        21866 => Some(encoding_rs::KOI8_U),

        // Macintosh
        10000 => Some(encoding_rs::MACINTOSH),     // Mac Roman (\mac)
        10001 => Some(encoding_rs::SHIFT_JIS),     // Mac Japanese
        10007 => Some(encoding_rs::X_MAC_CYRILLIC), // Mac Cyrillic

        // Unicode
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Map an RTF `\fcharset` value to the Windows codepage it implies.
///
/// Returns `None` for the ANSI/default charsets (the document codepage
/// applies), for the Symbol charset (handled by the symbol map), and for
/// charsets without a codepage.
pub fn charset_to_codepage(charset: i32) -> Option<u32> {
    match charset {
        77 => Some(10000),  // Mac Roman
        128 => Some(932),   // Shift-JIS
        129 => Some(949),   // Hangul
        130 => Some(1361),  // Johab
        134 => Some(936),   // GB2312
        136 => Some(950),   // Big5
        161 => Some(1253),  // Greek
        162 => Some(1254),  // Turkish
        163 => Some(1258),  // Vietnamese
        177 => Some(1255),  // Hebrew
        178 => Some(1256),  // Arabic
        186 => Some(1257),  // Baltic
        204 => Some(1251),  // Russian
        222 => Some(874),   // Thai
        238 => Some(1250),  // Eastern European
        254 => Some(437),   // PC 437
        255 => Some(850),   // OEM
        _ => None,
    }
}

/// Convert a hex digit to its nibble value (0-15).
#[inline(always)]
pub fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode bytes of a single-byte or multi-byte codepage into text.
///
/// Malformed sequences are replaced with `replacement` when one is given, in
/// which case the returned flag is `true`. Without a replacement the call
/// fails with [`EncodingError::Undecodable`].
pub fn decode_bytes<'a>(
    bytes: &'a [u8],
    encoding: &'static Encoding,
    replacement: Option<char>,
) -> Result<(Cow<'a, str>, bool), EncodingError> {
    if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok((text, false));
    }

    let Some(replacement) = replacement else {
        return Err(EncodingError::Undecodable {
            encoding: encoding.name(),
        });
    };

    let (text, _) = encoding.decode_without_bom_handling(bytes);
    if replacement == char::REPLACEMENT_CHARACTER {
        return Ok((text, true));
    }

    let mut buf = [0u8; 4];
    let replacement = replacement.encode_utf8(&mut buf);
    Ok((
        Cow::Owned(text.replace(char::REPLACEMENT_CHARACTER, replacement)),
        true,
    ))
}

/// Encode text into `encoding`.
///
/// `substitute` is consulted for every character the encoding cannot
/// represent; its result is encoded in place of the character. When it
/// returns `None` there is no replacement policy and the call fails with
/// [`EncodingError::Unencodable`].
pub fn encode_str<'a, F>(
    text: &'a str,
    encoding: &'static Encoding,
    mut substitute: F,
) -> Result<Cow<'a, [u8]>, EncodingError>
where
    F: FnMut(char) -> Option<String>,
{
    let encoding = encoding.output_encoding();
    if encoding == encoding_rs::UTF_8 || (text.is_ascii() && encoding.is_ascii_compatible()) {
        return Ok(Cow::Borrowed(text.as_bytes()));
    }

    let mut encoder = encoding.new_encoder();
    let mut output = Vec::with_capacity(text.len() + 16);
    let mut rest = text;

    loop {
        let needed = encoder
            .max_buffer_length_from_utf8_without_replacement(rest.len())
            .unwrap_or(rest.len() * 4 + 16);
        output.reserve(needed);

        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut output, true);
        rest = &rest[read..];

        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(ch) => {
                let Some(replacement) = substitute(ch) else {
                    return Err(EncodingError::Unencodable {
                        encoding: encoding.name(),
                        codepoint: ch as u32,
                    });
                };
                // The replacement itself may be unrepresentable; fall back to
                // the encoder's numeric character references in that case.
                let (bytes, _, _) = encoding.encode(&replacement);
                output.extend_from_slice(&bytes);
            },
        }
    }

    Ok(Cow::Owned(output))
}
