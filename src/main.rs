//! # ai-detect CLI
//!
//! Command-line interface for the AI image detector.
//!
//! ## Usage
//! ```bash
//! ai-detect detect photo.jpg --vit-model binary_ViT.onnx --residual-model binary_ReFor.onnx
//! ai-detect detect ~/Downloads/*.png --output json
//! ai-detect inspect photo.jpg
//! ```

mod cli;

use ai_image_detector::Result;

fn main() -> Result<()> {
    cli::run()
}
