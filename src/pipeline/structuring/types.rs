use super::StructuringError;

/// One image-analysis request to a vision-capable chat model.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    /// Standard base64 of the image bytes, no data-URL prefix.
    pub image_base64: &'a str,
    /// e.g. `image/jpeg`
    pub mime_type: &'a str,
}

/// Vision model client abstraction (allows mocking)
pub trait VisionClient {
    /// Send the request and return the raw text completion.
    fn analyze_image(&self, request: &VisionRequest<'_>) -> Result<String, StructuringError>;

    fn model_name(&self) -> &str;
}
