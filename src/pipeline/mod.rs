//! Pipeline stages for turning a Box.com preview into a PDF.
//!
//! Each submodule implements one step; [`crate::run`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ viewer ──▶ capture ──▶ [grayscale] ──▶ assemble ──▶ [ocr] ──▶ [cleanup]
//! (URL)     (Chrome)   (page_NNNN)  (in place)      (PDF)        (ocrmypdf)
//!                          ▲
//!                images ───┘  (--from-images)
//! ```
//!
//! 1. [`input`]    — validate the link or image directory, probe reachability
//! 2. [`viewer`]   — the [`viewer::Viewer`] seam and its Chrome implementation
//! 3. [`capture`]  — page through the viewer; [`decode`] turns data URLs into files
//! 4. [`images`]   — page file naming and listing of existing image sets
//! 5. [`grayscale`] — optional in-place conversion; runs in `spawn_blocking`
//! 6. [`assemble`] — native lopdf writer or external `img2pdf`
//! 7. [`ocr`]      — optional `ocrmypdf` pass
//! 8. [`cleanup`]  — optional removal of the page images
//!
//! [`tool`] runs the external programs for the last stages.

pub mod assemble;
pub mod capture;
pub mod cleanup;
pub mod decode;
pub mod grayscale;
pub mod images;
pub mod input;
pub mod ocr;
pub mod tool;
pub mod viewer;
