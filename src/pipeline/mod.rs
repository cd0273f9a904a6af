//! Pipeline stages behind a single form submission.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the OCR or completion backend can be swapped without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ store ──▶ extract ──▶ (prompts) ──▶ llm ──▶ store
//! (names)     (disk)    (pdfium+OCR)  (assemble)   (API)   (output)
//! ```
//!
//! 1. [`validate`]: extension check and filename sanitising
//! 2. [`store`]: write uploads, replace the output file
//! 3. [`extract`]: PDF → text via [`render`] and [`ocr`] on the blocking pool;
//!    `.txt` uploads are read as-is
//! 4. [`llm`]: the one network call

pub mod extract;
pub mod llm;
pub mod ocr;
pub mod render;
pub mod store;
pub mod validate;
