//! Resources compiled into the server binary.
//!
//! The loader script and the compiled NT4 client module ship inside the
//! executable, so they are served even when the asset root is empty or
//! missing.  The packaging step overwrites `assets/nt4_wasm_bg.wasm` with
//! the real client build, and `assets/nt4.js` with the JS glue generated
//! alongside it, before the server is compiled.  The two are a pair: the
//! loader must provide every function the module imports.

use crate::mime::types;

/// A fixed-name resource served straight from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedResource {
    /// File name, without the leading `/`.
    pub name: &'static str,
    pub content_type: &'static str,
    pub bytes: &'static [u8],
}

/// Loader script that instantiates the compiled module in the browser.
pub const LOADER_SCRIPT: EmbeddedResource = EmbeddedResource {
    name: "nt4.js",
    content_type: types::JAVASCRIPT,
    bytes: include_bytes!("../assets/nt4.js"),
};

/// The compiled NT4 client module.
pub const BINARY_MODULE: EmbeddedResource = EmbeddedResource {
    name: "nt4_wasm_bg.wasm",
    content_type: types::WASM,
    bytes: include_bytes!("../assets/nt4_wasm_bg.wasm"),
};

const ALL: [&EmbeddedResource; 2] = [&LOADER_SCRIPT, &BINARY_MODULE];

/// Look up an embedded resource by exact request path.
///
/// Both `/nt4.js` and `nt4.js` match; nothing else does (no trailing
/// slash, no query string, no nested directory).
pub fn lookup(path: &str) -> Option<&'static EmbeddedResource> {
    let name = path.strip_prefix('/').unwrap_or(path);
    ALL.into_iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_matches_exact_names() {
        assert_eq!(lookup("/nt4.js"), Some(&LOADER_SCRIPT));
        assert_eq!(lookup("nt4_wasm_bg.wasm"), Some(&BINARY_MODULE));
    }

    #[test]
    fn lookup_rejects_near_misses() {
        assert!(lookup("/nt4.js/").is_none());
        assert!(lookup("/lib/nt4.js").is_none());
        assert!(lookup("/NT4.JS").is_none());
        assert!(lookup("/").is_none());
    }

    #[test]
    fn binary_module_carries_wasm_header() {
        assert!(BINARY_MODULE.bytes.starts_with(b"\0asm"));
        assert_eq!(BINARY_MODULE.content_type, "application/wasm");
    }

    #[test]
    fn loader_script_exports_start() {
        let src = std::str::from_utf8(LOADER_SCRIPT.bytes).unwrap();
        assert!(src.contains("export async function start"));
        assert!(src.contains(BINARY_MODULE.name));
    }

    fn leb_u32(bytes: &[u8], pos: &mut usize) -> u32 {
        let mut result = 0u32;
        let mut shift = 0;
        loop {
            let b = bytes[*pos];
            *pos += 1;
            result |= u32::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return result;
            }
            shift += 7;
        }
    }

    fn name<'a>(bytes: &'a [u8], pos: &mut usize) -> &'a str {
        let len = leb_u32(bytes, pos) as usize;
        let s = std::str::from_utf8(&bytes[*pos..*pos + len]).unwrap();
        *pos += len;
        s
    }

    fn limits(bytes: &[u8], pos: &mut usize) {
        let flags = bytes[*pos];
        *pos += 1;
        leb_u32(bytes, pos);
        if flags & 1 != 0 {
            leb_u32(bytes, pos);
        }
    }

    /// `(module, field)` of every import in a wasm binary.
    fn wasm_imports(bytes: &[u8]) -> Vec<(String, String)> {
        let mut imports = Vec::new();
        let mut pos = 8;
        while pos < bytes.len() {
            let id = bytes[pos];
            pos += 1;
            let size = leb_u32(bytes, &mut pos) as usize;
            let end = pos + size;
            if id == 2 {
                for _ in 0..leb_u32(bytes, &mut pos) {
                    let module = name(bytes, &mut pos).to_string();
                    let field = name(bytes, &mut pos).to_string();
                    let kind = bytes[pos];
                    pos += 1;
                    match kind {
                        0 => {
                            leb_u32(bytes, &mut pos);
                        }
                        1 => {
                            pos += 1;
                            limits(bytes, &mut pos);
                        }
                        2 => limits(bytes, &mut pos),
                        _ => pos += 2,
                    }
                    imports.push((module, field));
                }
            }
            pos = end;
        }
        imports
    }

    #[test]
    fn import_reader_finds_function_imports() {
        #[rustfmt::skip]
        let module = [
            0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00,
            // type section: one `() -> ()`
            0x01, 0x04, 0x01, 0x60, 0x00, 0x00,
            // import section: wbg.__wbg_logx (func), wbg.mem (memory, min 1)
            0x02, 0x1d, 0x02,
            0x03, b'w', b'b', b'g', 0x0a, b'_', b'_', b'w', b'b', b'g', b'_', b'l', b'o', b'g', b'x',
            0x00, 0x00,
            0x03, b'w', b'b', b'g', 0x03, b'm', b'e', b'm',
            0x02, 0x00, 0x01,
        ];
        assert_eq!(
            wasm_imports(&module),
            vec![
                ("wbg".to_string(), "__wbg_logx".to_string()),
                ("wbg".to_string(), "mem".to_string()),
            ]
        );
    }

    #[test]
    fn loader_provides_every_module_import() {
        let loader = std::str::from_utf8(LOADER_SCRIPT.bytes).unwrap();
        for (module, field) in wasm_imports(BINARY_MODULE.bytes) {
            assert!(
                loader.contains(&field),
                "{} imports {module}.{field}, which {} does not provide; \
                 replace the loader with the glue generated for this module",
                BINARY_MODULE.name,
                LOADER_SCRIPT.name,
            );
        }
    }
}
