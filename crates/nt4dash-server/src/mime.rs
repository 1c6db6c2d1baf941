//! Extension → MIME type resolution.
//!
//! Total over its input: anything unrecognised is served as
//! [`types::PLAIN`] so an odd file in the asset root never blocks serving.

/// MIME type constants.
pub mod types {
    pub const HTML: &str = "text/html";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const CSS: &str = "text/css";
    pub const JSON: &str = "application/json";
    pub const WASM: &str = "application/wasm";
    pub const PLAIN: &str = "text/plain";
    pub const CSV: &str = "text/csv";
    pub const XML: &str = "application/xml";
    pub const SVG: &str = "image/svg+xml";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const ICO: &str = "image/x-icon";
    pub const WEBP: &str = "image/webp";
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const PDF: &str = "application/pdf";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Map an extension token (without the dot, any case) to a MIME type.
pub fn from_extension(ext: &str) -> &'static str {
    use types::*;

    match ext.to_ascii_uppercase().as_str() {
        "HTML" | "HTM" => HTML,
        "JS" | "MJS" => JAVASCRIPT,
        "CSS" => CSS,
        "JSON" | "MAP" => JSON,
        "WASM" => WASM,
        "TXT" => PLAIN,
        "CSV" => CSV,
        "XML" => XML,
        "SVG" => SVG,
        "PNG" => PNG,
        "JPG" | "JPEG" => JPEG,
        "GIF" => GIF,
        "ICO" => ICO,
        "WEBP" => WEBP,
        "WOFF" => WOFF,
        "WOFF2" => WOFF2,
        "TTF" => TTF,
        "OTF" => OTF,
        "PDF" => PDF,
        // Robot data logs offered for download from the dashboard.
        "WPILOG" => OCTET_STREAM,
        _ => PLAIN,
    }
}

/// Last dot-delimited segment of a request path, if the path has a dot.
///
/// The segment is taken verbatim, so `/v1.2/data` yields `2/data`, which
/// then falls through to [`types::PLAIN`].
pub fn extension_of(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(_, ext)| ext)
}

/// Resolve the content type for a request path.
pub fn from_path(path: &str) -> &'static str {
    extension_of(path).map_or(types::PLAIN, from_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_extensions_map() {
        assert_eq!(from_extension("html"), types::HTML);
        assert_eq!(from_extension("js"), types::JAVASCRIPT);
        assert_eq!(from_extension("wasm"), types::WASM);
        assert_eq!(from_extension("txt"), types::PLAIN);
    }

    const MAPPED: &[(&str, &str)] = &[
        ("html", types::HTML),
        ("htm", types::HTML),
        ("js", types::JAVASCRIPT),
        ("mjs", types::JAVASCRIPT),
        ("css", types::CSS),
        ("json", types::JSON),
        ("map", types::JSON),
        ("wasm", types::WASM),
        ("txt", types::PLAIN),
        ("csv", types::CSV),
        ("xml", types::XML),
        ("svg", types::SVG),
        ("png", types::PNG),
        ("jpg", types::JPEG),
        ("jpeg", types::JPEG),
        ("gif", types::GIF),
        ("ico", types::ICO),
        ("webp", types::WEBP),
        ("woff", types::WOFF),
        ("woff2", types::WOFF2),
        ("ttf", types::TTF),
        ("otf", types::OTF),
        ("pdf", types::PDF),
        ("wpilog", types::OCTET_STREAM),
    ];

    #[test]
    fn every_mapped_extension_resolves_in_any_case() {
        for &(ext, expected) in MAPPED {
            let upper = ext.to_ascii_uppercase();
            let mixed: String = ext
                .chars()
                .enumerate()
                .map(|(i, c)| if i % 2 == 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            for variant in [ext, upper.as_str(), mixed.as_str()] {
                assert_eq!(from_extension(variant), expected, "extension {variant:?}");
                assert_eq!(
                    from_path(&format!("/assets/file.{variant}")),
                    expected,
                    "path with extension {variant:?}"
                );
            }
        }
    }

    #[test]
    fn near_miss_extensions_are_plain() {
        for ext in ["htmlx", "j", "wasm2", "woff3", "jpe", "wpi"] {
            assert_eq!(from_extension(ext), types::PLAIN, "extension {ext:?}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(from_extension("HTML"), types::HTML);
        assert_eq!(from_extension("Js"), types::JAVASCRIPT);
        assert_eq!(from_extension("PnG"), types::PNG);
    }

    #[test]
    fn unknown_extension_defaults_to_plain() {
        assert_eq!(from_extension("flibbertigibbet"), types::PLAIN);
        assert_eq!(from_extension(""), types::PLAIN);
    }

    #[test]
    fn from_path_uses_last_segment() {
        assert_eq!(from_path("/index.html"), types::HTML);
        assert_eq!(from_path("/lib/chart.min.js"), types::JAVASCRIPT);
        assert_eq!(from_path("/logs/match_12.wpilog"), types::OCTET_STREAM);
    }

    #[test]
    fn from_path_without_extension_is_plain() {
        assert_eq!(extension_of("/LICENSE"), None);
        assert_eq!(from_path("/LICENSE"), types::PLAIN);
        assert_eq!(from_path("/v1.2/data"), types::PLAIN);
    }
}
