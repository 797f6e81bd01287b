/// Redundant vendor prefixes produced by `make_model` joins. No pattern is a
/// substring of another pattern's output, so the order does not matter.
const VENDOR_PREFIXES: &[(&str, &str)] = &[
    ("Canon_Canon_", "Canon_"),
    ("OnePlus_ONEPLUS_", "OnePlus_"),
    ("OLYMPUS_CORPORATION_", "OLYMPUS_"),
    ("CASIO_COMPUTER_CO.,LTD__", "CASIO_"),
    ("PENTAX_Corporation_PENTAX_", "PENTAX_"),
    ("NIKON_CORPORATION_NIKON_", "NIKON_"),
];

pub fn sanitize_stem(value: &str) -> String {
    value.replace('\0', "").replace('/', "_")
}

pub fn collapse_vendor_prefixes(value: &str) -> String {
    collapse_with(VENDOR_PREFIXES.iter(), value)
}

// Replacements only shorten the text, so repeating until no match terminates
// and makes a second pass a no-op.
fn collapse_with<'a, I>(table: I, value: &str) -> String
where
    I: Iterator<Item = &'a (&'a str, &'a str)>,
{
    table.fold(value.to_string(), |mut acc, (pattern, replacement)| {
        while acc.contains(pattern) {
            acc = acc.replace(pattern, replacement);
        }
        acc
    })
}
