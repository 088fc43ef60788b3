/// Spark-style substring: character based, out-of-range offsets are clamped.
pub fn substring(s: String, start: i64, length: i64) -> String {
    let chars: Vec<char> = s.chars().collect();
    let start = start.max(0).min(chars.len() as i64) as usize;
    let end = (start as i64 + length.max(0)).min(chars.len() as i64) as usize;
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_clamps() {
        assert_eq!(substring("cliente".to_string(), 0, 4), "clie");
        assert_eq!(substring("cliente".to_string(), 5, 100), "te");
        assert_eq!(substring("cliente".to_string(), -3, 2), "cl");
        assert_eq!(substring("cliente".to_string(), 99, 2), "");
    }
}
