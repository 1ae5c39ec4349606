pub mod exam_type;
pub mod loaders;
pub mod question;
pub mod subject;

pub use exam_type::ExamType;
pub use loaders::{load_all_seed_files, load_seed_file};
pub use question::{
    AcquisitionRequest, AnswerLetter, Difficulty, Provenance, Question, RawOptions, RawQuestion,
    SourceQuery,
};
pub use subject::Subject;
