mod request;
mod response;

pub use request::{CreateResponseBuilder, CreateResponsePayload, ItemParam, ToolParam};
pub use response::{
    FunctionCallItem, MessageItem, OutputItem, ResponseError, ResponseResource,
};
