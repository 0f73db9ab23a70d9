/*!
 * Tests for language utility functions
 */

use anyhow::Result;
use tranqual::language_utils::{get_language_name, language_codes_match, normalize_to_part2t, resolve_language_name};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("eng").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");

    // Case insensitivity and whitespace
    assert_eq!(normalize_to_part2t("EN").unwrap(), "eng");
    assert_eq!(normalize_to_part2t(" FRE ").unwrap(), "fra");

    assert!(normalize_to_part2t("xx").is_err());
    assert!(normalize_to_part2t("English").is_err());
}

#[test]
fn test_language_codes_match_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("de", "deu"));
    assert!(language_codes_match("ger", "de"));
    assert!(language_codes_match("zh", "chi"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "invalid"));
}

#[test]
fn test_get_language_name_withCodes_shouldReturnEnglishNames() -> Result<()> {
    assert_eq!(get_language_name("en")?, "English");
    assert_eq!(get_language_name("deu")?, "German");
    assert_eq!(get_language_name("fre")?, "French");
    assert!(get_language_name("zz").is_err());
    Ok(())
}

#[test]
fn test_resolve_language_name_withCodeOrName_shouldReturnPromptName() -> Result<()> {
    assert_eq!(resolve_language_name("es")?, "Spanish");
    assert_eq!(resolve_language_name("spa")?, "Spanish");
    assert_eq!(resolve_language_name("Spanish")?, "Spanish");
    assert_eq!(resolve_language_name("FRENCH")?, "French");
    Ok(())
}

#[test]
fn test_resolve_language_name_withEmptyInput_shouldFail() {
    assert!(resolve_language_name("   ").is_err());
}
