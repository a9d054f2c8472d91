use std::collections::{BTreeSet, HashMap};

use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use ragstore_core::types::{Position, SearchHit, SourceKind};

use crate::tantivy_utils::keyword_analyzer;

/// Inverted index from keyword to the positions containing it.
///
/// Postings only ever grow: ingestion indexes the newly accepted positions
/// and never rebuilds the whole map.
#[derive(Clone)]
pub struct KeywordIndex {
	analyzer: TextAnalyzer,
	min_len: usize,
	max_len: usize,
	postings: HashMap<String, BTreeSet<Position>>,
	indexed: BTreeSet<Position>,
}

impl KeywordIndex {
	pub fn new(min_len: usize, max_len: usize) -> Self {
		Self { analyzer: keyword_analyzer(), min_len, max_len, postings: HashMap::new(), indexed: BTreeSet::new() }
	}

	/// Lowercased tokens whose character length falls in `[min_len, max_len]`.
	pub fn extract_keywords(&self, text: &str) -> BTreeSet<String> {
		let mut analyzer = self.analyzer.clone();
		let mut stream = analyzer.token_stream(text);
		let mut keywords = BTreeSet::new();
		while stream.advance() {
			let token = &stream.token().text;
			let len = token.chars().count();
			if len >= self.min_len && len <= self.max_len { keywords.insert(token.clone()); }
		}
		keywords
	}

	/// Add `position` to the posting set of every keyword in `text`.
	/// Re-indexing a position with the same text changes nothing.
	pub fn index(&mut self, position: Position, text: &str) {
		for keyword in self.extract_keywords(text) {
			self.postings.entry(keyword).or_default().insert(position);
		}
		self.indexed.insert(position);
	}

	/// Top-`k` positions by number of distinct query keywords matched.
	/// Ties go to the earlier position.
	pub fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
		let mut counts: HashMap<Position, usize> = HashMap::new();
		for keyword in self.extract_keywords(query) {
			if let Some(positions) = self.postings.get(&keyword) {
				for &pos in positions { *counts.entry(pos).or_default() += 1; }
			}
		}
		let mut ranked: Vec<(Position, usize)> = counts.into_iter().collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
		ranked.truncate(k);
		ranked.into_iter().map(|(position, matched)| SearchHit { position, score: matched as f32, source: SourceKind::Keyword }).collect()
	}

	pub fn posting(&self, keyword: &str) -> Option<&BTreeSet<Position>> { self.postings.get(keyword) }

	pub fn keyword_count(&self) -> usize { self.postings.len() }

	pub fn indexed_positions(&self) -> &BTreeSet<Position> { &self.indexed }

	pub fn is_empty(&self) -> bool { self.postings.is_empty() }
}
