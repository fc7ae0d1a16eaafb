//! # Financial Statement Analyzer
//!
//! A library for turning Japanese institutional financial statements (千円
//! units) into a structured numeric model, verifying their internal
//! arithmetic consistency, and generating a multi-stage narrative analysis
//! through a generative model with quota-aware fallback.
//!
//! ## Core Concepts
//!
//! - **Extraction fallback chain**: structured whole-document extraction,
//!   then targeted single-field extraction, then a fixed reference dataset
//! - **Integrity verification**: five arithmetic consistency checks scored as
//!   a percentage, with itemized Japanese warnings
//! - **Chain-of-thought analysis**: safety, profitability, cash flow, then
//!   risk and recommendations, each stage prompted from the previous outputs
//! - **Model ladder**: four increasingly conservative model configurations,
//!   descended on quota pressure, retried with backoff on other failures
//! - **Citation injection**: every known amount in the report is annotated
//!   with its source field
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_statement_analyzer::*;
//!
//! let client = GeminiClient::new(api_key);
//! let structurer = GeminiStructurer::new(client.clone(), "gemini-1.5-flash");
//! let service = AnalysisService::new(
//!     structurer,
//!     client,
//!     GatewayConfig::default(),
//!     ExtractorConfig::default(),
//!     VerifierConfig::default(),
//! );
//!
//! let mut verified = service.extract_and_verify(&base64_pdf).await?;
//! if verified.verification.is_valid {
//!     let report = service.approve_and_analyze(&mut verified, Some("auditor")).await?;
//!     println!("{report}");
//! }
//! ```

pub mod api;
pub mod citations;
pub mod cleaning;
pub mod currency;
pub mod error;
pub mod llm;
pub mod reference;
pub mod statements;
pub mod store;
pub mod verification;

pub use api::{AnalysisService, ApiRequest, ApiResponse};
pub use citations::{inject_citations, CitationAnnotator, LiteralCitationAnnotator};
pub use cleaning::clean_analysis_text;
pub use currency::{
    extract_numbers, format_japanese_currency, normalize_financial_item_name,
    parse_japanese_currency,
};
pub use error::{AnalyzerError, Result};
pub use llm::*;
pub use reference::{reference_statements, HOSPITAL_SEGMENT, REFERENCE_ORGANIZATION};
pub use statements::*;
pub use store::{DocumentRecord, DocumentStore, MemoryDocumentStore, NewDocument};
pub use verification::{
    attach_verification, perform_integrity_check, IntegrityCheck, VerificationResult,
    VerificationStatus, VerifiedFinancialData, VerifierConfig,
};
