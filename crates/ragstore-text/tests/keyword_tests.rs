use ragstore_core::types::SourceKind;
use ragstore_text::KeywordIndex;

fn positions(index: &KeywordIndex, query: &str, k: usize) -> Vec<usize> {
    index.search(query, k).into_iter().map(|h| h.position).collect()
}

#[test]
fn extraction_lowercases_and_filters_length() {
    let index = KeywordIndex::new(2, 20);
    let kws = index.extract_keywords("A Port-Authority notice: Vessels MUST report; x supercalifragilisticexpialidocious");
    assert!(kws.contains("port"));
    assert!(kws.contains("authority"));
    assert!(kws.contains("vessels"));
    assert!(kws.contains("must"));
    assert!(!kws.contains("a"), "single characters are dropped");
    assert!(!kws.contains("x"));
    assert!(!kws.iter().any(|k| k.starts_with("supercali")), "tokens longer than 20 chars are dropped");
}

#[test]
fn extraction_handles_hangul() {
    let index = KeywordIndex::new(2, 20);
    let kws = index.extract_keywords("항만법 시행령, 제3조");
    assert!(kws.contains("항만법"));
    assert!(kws.contains("시행령"));
    assert!(kws.contains("제3조"));
}

#[test]
fn ranks_by_matched_terms_then_position() {
    let mut index = KeywordIndex::new(2, 20);
    index.index(0, "harbor fees apply to cargo");
    index.index(1, "cargo inspection schedule");
    index.index(2, "harbor cargo inspection fees");

    let hits = index.search("cargo inspection fees", 10);
    let ranked: Vec<usize> = hits.iter().map(|h| h.position).collect();
    assert_eq!(ranked, vec![2, 0, 1]);
    assert_eq!(hits[0].score, 3.0);
    assert!(hits.iter().all(|h| h.source == SourceKind::Keyword));
}

#[test]
fn ties_break_by_ingestion_order() {
    let mut index = KeywordIndex::new(2, 20);
    index.index(0, "berth allocation");
    index.index(1, "pilotage request");
    index.index(2, "unrelated text");

    // each document matches exactly one of the two query keywords
    assert_eq!(positions(&index, "pilotage berth", 5), vec![0, 1]);
    assert_eq!(positions(&index, "berth pilotage", 1), vec![0]);
}

#[test]
fn reindexing_is_a_noop_and_queries_without_keywords_miss() {
    let mut index = KeywordIndex::new(2, 20);
    index.index(0, "customs declaration");
    let before = index.keyword_count();
    index.index(0, "customs declaration");
    assert_eq!(index.keyword_count(), before);
    assert_eq!(index.posting("customs").map(|p| p.len()), Some(1));
    assert_eq!(index.indexed_positions().len(), 1);

    assert!(index.search("a", 5).is_empty());
    assert!(index.search("nothing matches", 5).is_empty());
    assert!(KeywordIndex::new(2, 20).search("customs", 5).is_empty());
}
