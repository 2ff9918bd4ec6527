use anybot::errors::PromptError;
use anybot::providers::ai::{AiProvider, Generation, GenerationOptions};
use anybot::types::TokenUsage;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

// --- Mock AI Provider ---

/// One recorded call to the mock.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub options: GenerationOptions,
}

/// A scripted `AiProvider`.
///
/// Responses are looked up by a substring of the system prompt first, then
/// taken from a FIFO queue. Clones share their state, so a test can keep a
/// handle while the code under test owns a boxed copy.
#[derive(Clone, Debug, Default)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    queue: Arc<Mutex<VecDeque<String>>>,
    failure: Arc<Mutex<Option<String>>>,
    usage: Arc<Mutex<Option<TokenUsage>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Queues a response for the next call that matches no key.
    pub fn push_response(&self, response: &str) {
        self.queue.lock().unwrap().push_back(response.to_string());
    }

    /// Makes every following call fail with `PromptError::AiApi`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Reports this usage on every generation.
    pub fn with_usage(self, usage: TokenUsage) -> Self {
        *self.usage.lock().unwrap() = Some(usage);
        self
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// A boxed clone, ready to hand to the code under test.
    pub fn boxed(&self) -> Box<dyn AiProvider> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, PromptError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            options: options.clone(),
        });

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(PromptError::AiApi(message));
        }

        let usage = *self.usage.lock().unwrap();
        let keyed = {
            let responses = self.responses.lock().unwrap();
            responses
                .iter()
                .find(|(key, _)| system_prompt.contains(key.as_str()))
                .map(|(_, response)| response.clone())
        };
        let text = match keyed {
            Some(text) => text,
            None => self.queue.lock().unwrap().pop_front().ok_or_else(|| {
                PromptError::AiApi(format!(
                    "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
                ))
            })?,
        };
        Ok(Generation { text, usage })
    }
}

// --- Fixtures ---

/// The two-row sheet used across ingestion tests.
pub const TWO_ROW_CSV: &str = "title,content\nA,\"Hello world\"\nB,\"Bye\"";

/// A Turkish-headed export with a category column.
pub const TURKISH_CSV: &str = "Başlık,İçerik,Kategori\nKargo,\"Kargo 3 iş gününde, hafta içi teslim edilir.\",Teslimat\nİade,\"İade süresi 14 gündür.\",İade";

/// A batch-classification body for `n` records, all filed under `category`.
pub fn classification_json(n: usize, category: &str) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"category":"{category}","intent":"intent_{i}","keywords":["k{i}"],"confidence":0.9}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

// --- Test-Specific Helpers ---
#[cfg(any(feature = "pdf", feature = "sheets"))]
pub mod helpers {
    use anyhow::Result;
    #[cfg(feature = "pdf")]
    use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

    /// Generates a single-page PDF with one text object per paragraph.
    ///
    /// Each paragraph ends with a line break before its text object closes,
    /// so extracted text has a blank line between paragraphs.
    #[cfg(feature = "pdf")]
    pub fn generate_test_pdf(paragraphs: &[&str]) -> Result<Vec<u8>> {
        let mut pdf = Pdf::new();

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let font_id = Ref::new(4);
        let content_id = Ref::new(5);
        let font_name = Name(b"F1");

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, 595.0, 842.0));
        page.parent(page_tree_id);
        page.contents(content_id);
        page.resources().fonts().pair(font_name, font_id);
        page.finish();

        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

        let mut content = Content::new();
        for (idx, paragraph) in paragraphs.iter().enumerate() {
            content.begin_text();
            content.set_font(font_name, 12.0);
            content.set_leading(14.0);
            content.next_line(72.0, 760.0 - 40.0 * idx as f32);
            content.show(Str(paragraph.as_bytes()));
            content.next_line_using_leading();
            content.end_text();
        }
        pdf.stream(content_id, &content.finish());

        Ok(pdf.finish())
    }

    /// Generates an `.xlsx` workbook with one worksheet per `(name, rows)`
    /// pair, in order. Empty strings leave the cell blank.
    #[cfg(feature = "sheets")]
    pub fn generate_test_xlsx(sheets: &[(&str, &[&[&str]])]) -> Result<Vec<u8>> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name)?;
            for (row_idx, row) in rows.iter().enumerate() {
                for (col_idx, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        worksheet.write_string(row_idx as u32, col_idx as u16, *value)?;
                    }
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}
