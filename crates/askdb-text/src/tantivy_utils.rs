use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "lowercase_words";

/// Two fields: the stored chunk id and the indexed-only chunk text.
/// Text lives in the snapshot metadata, so it is not stored twice.
pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _chunk_id_field = schema_builder.add_u64_field("chunk_id", STORED);
    let text_field_indexing = TextFieldIndexing::default()
        .set_tokenizer(TOKENIZER_NAME)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
    let _text_field = schema_builder.add_text_field("text", text_options);
    schema_builder.build()
}

/// Case-folded alphanumeric word tokens; queries are tokenized the same
/// way as chunk text.
pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
