//! Native unpacker for scripts produced by Dean Edwards' packer, i.e. the
//! `eval(function(p,a,c,k,e,d){...}('payload',radix,count,'symtab'.split('|'),0,{}))`
//! shape served by many embed hosts.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ExtractorError;

pub const PACKED_MARKER: &str = "eval(function(p,a,c,k,e,d)";

static PACKED_ARGS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\}\s*\(\s*'((?:\\'|[^'])*)'\s*,\s*(\d+|\[\])\s*,\s*(\d+)\s*,\s*'((?:\\'|[^'])*)'\.split\(\s*'\|'\s*\)"#,
    )
    .unwrap()
});
static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

const ALPHABET_62: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHABET_95: &str = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

pub struct JsUnpacker;

impl JsUnpacker {
    pub fn is_packed(script: &str) -> bool {
        script.contains(PACKED_MARKER)
    }

    pub fn unpack(script: &str) -> Result<String, ExtractorError> {
        let captures = PACKED_ARGS_REGEX
            .captures(script)
            .ok_or_else(|| ExtractorError::Unpack("packer arguments not found".to_string()))?;

        let payload = captures[1].replace("\\'", "'");
        let radix = match &captures[2] {
            "[]" => 62,
            value => value
                .parse::<u32>()
                .map_err(|e| ExtractorError::Unpack(format!("invalid radix {value}: {e}")))?,
        };
        let count = captures[3]
            .parse::<usize>()
            .map_err(|e| ExtractorError::Unpack(format!("invalid word count: {e}")))?;
        let symtab: Vec<&str> = captures
            .get(4)
            .map(|m| m.as_str().split('|').collect())
            .unwrap_or_default();

        if symtab.len() != count {
            return Err(ExtractorError::Unpack(format!(
                "symbol table has {} entries, expected {count}",
                symtab.len()
            )));
        }
        if !(2..=95).contains(&radix) {
            return Err(ExtractorError::Unpack(format!("unsupported radix {radix}")));
        }

        let unpacked = WORD_REGEX.replace_all(&payload, |caps: &Captures| {
            let word = &caps[0];
            unbase(word, radix)
                .and_then(|index| symtab.get(index))
                .filter(|symbol| !symbol.is_empty())
                .map(|symbol| symbol.to_string())
                .unwrap_or_else(|| word.to_string())
        });

        Ok(unpacked.into_owned())
    }
}

fn unbase(word: &str, radix: u32) -> Option<usize> {
    if radix <= 36 {
        return usize::from_str_radix(word, radix).ok();
    }

    let alphabet = if radix <= 62 {
        &ALPHABET_62[..radix as usize]
    } else {
        &ALPHABET_95[..radix as usize]
    };
    word.chars().try_fold(0usize, |acc, c| {
        let digit = alphabet.find(c)?;
        acc.checked_mul(radix as usize)?.checked_add(digit)
    })
}
