//! Name inflection for tables and models
//!
//! Model names are derived from table names with a fixed rule set: the last
//! underscore-separated word is singularized and the result is camel-cased
//! (`user_profiles` -> `UserProfile`). The rules are pure functions of their
//! input so the same table always yields the same model name.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "news",
    "series",
    "species",
    "sheep",
    "fish",
];

/// Trim a table name, rejecting blank input
pub fn canonical_table_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Camel-case a model name, rejecting blank input
pub fn canonical_model_name(name: &str) -> Option<String> {
    let name = camelize(name.trim());
    (!name.is_empty()).then_some(name)
}

/// Derive the model name for a table: `organizations` -> `Organization`
pub fn model_name_for_table(table: &str) -> String {
    camelize(&map_last_word(table, singularize_word))
}

/// `organization` -> `organizations`, `user_category` -> `user_categories`
pub fn pluralize(word: &str) -> String {
    map_last_word(word, pluralize_word)
}

/// `organizations` -> `organization`, `user_addresses` -> `user_address`
pub fn singularize(word: &str) -> String {
    map_last_word(word, singularize_word)
}

/// `user_profile` -> `UserProfile`; already camel-cased input is kept
pub fn camelize(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `UserProfile` -> `user_profile`
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn map_last_word(name: &str, f: fn(&str) -> String) -> String {
    match name.rfind('_') {
        Some(idx) => format!("{}{}", &name[..=idx], f(&name[idx + 1..])),
        None => f(name),
    }
}

fn is_uncountable(word: &str) -> bool {
    UNCOUNTABLE.contains(&word.to_lowercase().as_str())
}

fn singularize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if is_uncountable(&lower) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return singular.to_string();
    }

    if lower.ends_with("ies") && lower.len() > 3 {
        format!("{}y", &word[..word.len() - 3])
    } else if ["sses", "xes", "ches", "shes", "zes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        word[..word.len() - 2].to_string()
    } else if lower.ends_with("ss") || lower.ends_with("us") {
        word.to_string()
    } else if lower.ends_with('s') {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if is_uncountable(&lower) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return plural.to_string();
    }

    let consonant_y = lower.ends_with('y')
        && lower
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| !"aeiou".contains(c));

    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}
