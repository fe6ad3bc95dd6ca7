//! Small fixed-column parsing helpers shared by every decoder.

/// Fortran-style float: tolerates `D` exponents and blank fields.
/// Blank stays `None` (missing), never zero.
pub(crate) fn fortran_f64(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if t.contains(['D', 'd']) {
        t.replace(['D', 'd'], "E").parse::<f64>().ok()
    } else {
        t.parse::<f64>().ok()
    }
}

/// Column slice tolerant of short (right-trimmed) lines.
/// Returns "" past the end, or on a (lossy-decoded) non-ASCII boundary.
pub(crate) fn subfield(line: &str, start: usize, len: usize) -> &str {
    if start >= line.len() {
        return "";
    }
    let end = (start + len).min(line.len());
    line.get(start..end).unwrap_or("")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fortran_floats() {
        assert_eq!(fortran_f64("  .186264514923D-08"), Some(0.186264514923e-8));
        assert_eq!(fortran_f64("-0.123456789012D+04"), Some(-1234.56789012));
        assert_eq!(fortran_f64(" 23619095.450"), Some(23619095.450));
        assert_eq!(fortran_f64("              "), None);
        assert_eq!(fortran_f64("garbage"), None);
    }

    #[test]
    fn subfields() {
        let line = "G07  20147683.700";
        assert_eq!(subfield(line, 0, 3), "G07");
        assert_eq!(subfield(line, 3, 14), "  20147683.700");
        assert_eq!(subfield(line, 3, 60), "  20147683.700");
        assert_eq!(subfield(line, 60, 10), "");
    }
}
