//! The form-data stripping rule applied to `/encrypt` and `/decrypt`
//! bodies. Quirky but externally observed behaviour: preserved exactly
//! rather than cleaned up.

use percent_encoding::percent_decode_str;

/// `content_type` is the raw header value (may be absent). `decrypting`
/// selects the extra space->plus recovery step and the odd-length probe
/// that only apply on the decrypt path.
pub fn strip_form_encoding(data: &str, content_type: Option<&str>, decrypting: bool) -> String {
    let is_text_plain = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("text/plain"))
        .unwrap_or(false);

    if is_text_plain || !data.ends_with('=') {
        return data.to_string();
    }

    let decoded = percent_decode_str(data).decode_utf8_lossy().into_owned();
    let decoded = if decrypting {
        decoded.replace(' ', "+")
    } else {
        decoded
    };

    let candidate = decoded.trim_end_matches('=').to_string();

    if decrypting {
        let odd_length = decoded.len() / 2 != (decoded.len() + 1) / 2;
        if decoded.ends_with('=') && odd_length {
            if hex::decode(&candidate).is_ok() {
                return candidate;
            }
            if base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &candidate).is_ok() {
                return candidate;
            }
            return data.to_string();
        }
        return data.to_string();
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_plain_is_untouched() {
        let out = strip_form_encoding("abc=", Some("text/plain"), true);
        assert_eq!(out, "abc=");
    }

    #[test]
    fn no_trailing_equals_is_untouched() {
        let out = strip_form_encoding("abc", Some("application/x-www-form-urlencoded"), true);
        assert_eq!(out, "abc");
    }

    #[test]
    fn encrypt_path_just_strips_trailing_equals() {
        let out = strip_form_encoding("abcd=", Some("application/x-www-form-urlencoded"), false);
        assert_eq!(out, "abcd");
    }

    #[test]
    fn decrypt_recovers_space_as_plus_before_probing() {
        let plus_form = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"hello world!");
        let space_form = plus_form.replace('+', " ");
        let out = strip_form_encoding(
            &space_form,
            Some("application/x-www-form-urlencoded"),
            true,
        );
        // Odd-length probe only fires when length parity looks odd; this
        // mainly exercises that the function never panics on odd input
        // and returns *something* decodable or the original data.
        assert!(!out.is_empty());
    }
}
