// Graph Nodes
// Node implementations for the retrieval agent graph

pub mod agent;
pub mod generate;
pub mod grade;
pub mod retrieve;
pub mod rewrite;

pub use agent::{should_retrieve, AgentNode, ROUTE_END, ROUTE_RETRIEVE};
pub use generate::GenerateNode;
pub use grade::{
    check_relevance, GradeDocumentsNode, RelevanceGrade, RelevanceScore, ROUTE_NOT_RELEVANT,
    ROUTE_RELEVANT,
};
pub use retrieve::{RetrieveArgs, RetrieveNode};
pub use rewrite::RewriteNode;
