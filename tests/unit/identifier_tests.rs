/*!
 * Tests for catalog identifier resolution
 */

use screenwise::errors::PipelineError;
use screenwise::identifier::ImdbId;

#[test]
fn test_resolve_withUrlVariants_shouldAllYieldSameId() {
    let inputs = [
        "tt0398286",
        "  TT0398286 ",
        "0398286",
        "https://www.imdb.com/title/tt0398286/",
        "https://m.imdb.com/title/tt0398286/?ref_=nv_sr_srsg_0",
        "imdb.com/title/tt0398286",
    ];
    for input in inputs {
        let id = ImdbId::resolve(input).unwrap_or_else(|e| panic!("{:?}: {}", input, e));
        assert_eq!(id.as_str(), "tt0398286", "input {:?}", input);
    }
}

#[test]
fn test_resolve_withEightDigits_shouldKeepAllDigits() {
    assert_eq!(ImdbId::resolve("tt10872600").unwrap().to_string(), "tt10872600");
}

#[test]
fn test_resolve_withGarbage_shouldBeInvalidIdentifier() {
    for input in ["", "   ", "tangled", "tt123", "https://example.com/movie/42", "nm0000123"] {
        assert!(
            matches!(ImdbId::resolve(input), Err(PipelineError::InvalidIdentifier(_))),
            "input {:?}",
            input
        );
    }
}

#[test]
fn test_fromStr_shouldMatchResolve() {
    let parsed: ImdbId = "https://www.imdb.com/title/tt0317219/".parse().unwrap();
    assert_eq!(parsed, ImdbId::resolve("tt0317219").unwrap());
}
