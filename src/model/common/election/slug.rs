/// Derive a URL slug from an election name.
///
/// ASCII letters and digits are kept (lower-cased); every other run of
/// characters collapses into a single hyphen, with none at either end.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("SSC Election 2024"), "ssc-election-2024");
        assert_eq!(slugify("  Grade 12 -- Officers!! "), "grade-12-officers");
        assert_eq!(slugify("Señor Class"), "se-or-class");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(&slugify("Student Council")), "student-council");
    }
}
