use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};

/// Splits on non-alphanumeric characters (any script) and lowercases.
pub fn keyword_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.build()
}
