//! Text encoding for the standard Helvetica font.
//!
//! Overlay text is set in Helvetica with `WinAnsiEncoding`, so strings are
//! written as single-byte Windows-1252 codes. Latin-1 maps onto itself; the
//! 0x80-0x9F block holds the typographic extras below. Anything else becomes
//! `?`.

/// Characters of the Windows-1252 block 0x80-0x9F.
const CP1252_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

const FALLBACK: u8 = b'?';

/// Encode text as WinAnsi bytes for a `Tj` string operand.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    let code = u32::from(c);
    match code {
        0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).unwrap_or(FALLBACK),
        _ => CP1252_EXTRAS
            .iter()
            .find(|(ch, _)| *ch == c)
            .map_or(FALLBACK, |(_, byte)| *byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(encode_win_ansi("5 10"), b"5 10".to_vec());
    }

    #[test]
    fn test_latin1_accents() {
        // "SÃO" and "N°" from the Brazil and Chile profiles
        assert_eq!(encode_win_ansi("SÃO"), vec![b'S', 0xC3, b'O']);
        assert_eq!(encode_win_ansi("N°"), vec![b'N', 0xB0]);
    }

    #[test]
    fn test_cp1252_extras_and_fallback() {
        assert_eq!(encode_win_ansi("€–"), vec![0x80, 0x96]);
        assert_eq!(encode_win_ansi("한"), vec![b'?']);
        assert_eq!(encode_win_ansi("a\tb"), vec![b'a', b'?', b'b']);
    }
}
