//! Callout text → sample keys.
//!
//! A left-to-right scan over space-separated lowercase tokens; multi-word
//! phrases consume greedily and unknown tokens are skipped, so any text the
//! note layer can produce parses without error.

/// Parse callout text into ordered sample keys.
///
/// `"two hundred left four tightens"` → `["200", "left_four", "tightens"]`.
pub fn parse_sample_keys(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let parts: Vec<&str> = lowered.split_whitespace().collect();
    let mut keys = Vec::new();
    let mut i = 0;

    while i < parts.len() {
        let word = parts[i];
        let next = parts.get(i + 1).copied();

        // Compound distance words.
        if word == "one" && next == Some("thousand") {
            keys.push("1000".to_owned());
            i += 2;
            continue;
        }
        if word == "five" && next == Some("hundred") {
            keys.push("500".to_owned());
            i += 2;
            continue;
        }
        if next == Some("hundred") {
            if let Some(number) = match word {
                "one" => Some("100"),
                "two" => Some("200"),
                "three" => Some("300"),
                "four" => Some("400"),
                _ => None,
            } {
                keys.push(number.to_owned());
                i += 2;
                continue;
            }
        }
        if word == "one" && next == Some("fifty") {
            keys.push("150".to_owned());
            i += 2;
            continue;
        }
        if let Some(number) = match word {
            "thirty" => Some("30"),
            "forty" => Some("40"),
            "fifty" => Some("50"),
            "sixty" => Some("60"),
            "seventy" => Some("70"),
            "eighty" => Some("80"),
            _ => None,
        } {
            keys.push(number.to_owned());
            i += 1;
            continue;
        }

        // "{left|right} {severity}"
        if (word == "left" || word == "right")
            && let Some(severity) = next
            && matches!(
                severity,
                "hairpin" | "square" | "flat" | "two" | "three" | "four" | "five" | "six"
            )
        {
            keys.push(format!("{word}_{severity}"));
            i += 2;
            continue;
        }

        // "{hairpin|square|flat} {left|right}"
        if matches!(word, "hairpin" | "square" | "flat")
            && let Some(direction @ ("left" | "right")) = next
        {
            keys.push(format!("{direction}_{word}"));
            i += 2;
            continue;
        }

        // "chicane {left|right} {left|right}" — one sample keyed by entry.
        if word == "chicane"
            && let Some(entry @ ("left" | "right")) = next
            && i + 2 < parts.len()
        {
            keys.push(format!("{entry}_entry_chicane"));
            i += 3;
            continue;
        }

        // Two-word details.
        if word == "over" && next == Some("bridge") {
            keys.push("over_bridge".to_owned());
            i += 2;
            continue;
        }
        if word == "over" && next == Some("rails") {
            keys.push("over_rails".to_owned());
            i += 2;
            continue;
        }
        if word == "onto"
            && let Some(surface @ ("gravel" | "tarmac" | "concrete")) = next
        {
            keys.push(format!("onto_{surface}"));
            i += 2;
            continue;
        }
        if word == "cattle" && next == Some("grid") {
            keys.push("cattle_grid".to_owned());
            i += 2;
            continue;
        }

        // Single-word details.
        if matches!(
            word,
            "tightens"
                | "opens"
                | "long"
                | "caution"
                | "junction"
                | "tunnel"
                | "water"
                | "bump"
                | "bumps"
                | "narrows"
                | "gate"
        ) {
            keys.push(word.to_owned());
            i += 1;
            continue;
        }

        // Unknown token: skip.
        i += 1;
    }

    keys
}
