// Graph Nodes
// One node per workflow stage

pub mod answer;
pub mod evaluate;
pub mod retrieve;
pub mod rewrite;

pub use answer::AnswerNode;
pub use evaluate::EvaluateNode;
pub use retrieve::RetrieveNode;
pub use rewrite::RewriteNode;
