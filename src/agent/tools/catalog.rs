//! Function declarations sent to the model, one per `ToolKind`

use serde_json::{Value, json};

use super::ToolKind;
use crate::agent::llm::ToolDeclaration;

#[inline]
pub fn declaration(kind: ToolKind) -> ToolDeclaration {
    let (description, parameters) = match kind {
        ToolKind::SendEmail => (
            "Send an email",
            object(
                json!({
                    "to": string(),
                    "subject": string(),
                    "message": string()
                }),
                &["to", "subject", "message"],
            ),
        ),
        ToolKind::ListCourses => (
            "List all courses for the user. You can use this function to get the course_id",
            object(json!({}), &[]),
        ),
        ToolKind::ListCourseStudents => (
            "List all students for a course. You can use this function to get the student_id",
            object(json!({"course_id": string()}), &["course_id"]),
        ),
        ToolKind::GetStudent => (
            "Get a student by id",
            course_and(&["student_id"]),
        ),
        ToolKind::ListStudentSubmissions => (
            "List all submissions for a student. You can use this function to get the coursework_id. \
             To read a submitted file, download it from Google Drive using the driveFile id in the response",
            course_and(&["student_id"]),
        ),
        ToolKind::GetCoursework => ("Get a coursework by id", course_and(&["coursework_id"])),
        ToolKind::GetCourseworkMaterials => (
            "Get the materials for a coursework",
            course_and(&["coursework_id"]),
        ),
        ToolKind::ListCourseworks => (
            "List all coursework for a course",
            object(json!({"course_id": string()}), &["course_id"]),
        ),
        ToolKind::DownloadFileFromDriveAndUploadToGemini => (
            "Download a file from Google Drive and upload it to Gemini. \
             file_id can be fetched using the list_courseworks(course_id) function",
            object(json!({"file_id": string()}), &["file_id"]),
        ),
        ToolKind::SummarizeFileFromGemini => (
            "Summarize a file that has been uploaded to Gemini. \
             file_uri is returned by download_file_from_drive_and_upload_to_gemini",
            object(json!({"file_uri": string()}), &["file_uri"]),
        ),
        ToolKind::CreateQuiz => (
            "Create a quiz. quiz_questions is a list of questions; each has question, options, \
             isRequired, type, pointValue and correctAnswers. type can be RADIO, CHECKBOX or DROPDOWN",
            object(
                json!({
                    "quiz_name": string(),
                    "quiz_description": string(),
                    "quiz_questions": array(object(
                        json!({
                            "question": string(),
                            "options": array(value_object()),
                            "isRequired": {"type": "boolean"},
                            "type": string(),
                            "pointValue": number(),
                            "correctAnswers": object(
                                json!({"answers": array(value_object())}),
                                &["answers"],
                            )
                        }),
                        &["question", "options", "isRequired", "type", "pointValue", "correctAnswers"],
                    ))
                }),
                &["quiz_name", "quiz_description", "quiz_questions"],
            ),
        ),
        ToolKind::CreateAnnouncement => (
            "Create an announcement for a course. announcement_body has course_id and text",
            object(
                json!({
                    "course_id": string(),
                    "announcement_body": object(
                        json!({"course_id": string(), "text": string()}),
                        &["course_id", "text"],
                    ),
                    "materials": array(material())
                }),
                &["course_id", "announcement_body", "materials"],
            ),
        ),
        ToolKind::ListForms => ("List all forms", object(json!({}), &[])),
        ToolKind::GetForm => (
            "Get details about a specific form",
            object(json!({"form_id": string()}), &["form_id"]),
        ),
        ToolKind::ListFormResponses => (
            "List all responses for a specific form",
            object(json!({"form_id": string()}), &["form_id"]),
        ),
        ToolKind::GetFormResponse => (
            "Get details about a specific response",
            object(
                json!({"form_id": string(), "response_id": string()}),
                &["form_id", "response_id"],
            ),
        ),
        ToolKind::QuestionBankGenerator => (
            "Generate a question bank for a course. Write the questions yourself from the course topic. \
             Each section has a part_label (A, B, C...), marks and a questions array; each question has \
             'q' and optionally 'image_ref', which must be a real image URL",
            document_sections(object(
                json!({"q": string(), "image_ref": string()}),
                &[],
            ), "questions"),
        ),
        ToolKind::AnswerKeyGenerator => (
            "Generate an answer key for a course. Write the answers yourself from the course topic. \
             Each section has a part_label (A, B, C...), marks and an answers array; each answer has \
             'question', 'answer' and optionally 'image_ref', which must be a real image URL",
            document_sections(object(
                json!({"question": string(), "answer": string(), "image_ref": string()}),
                &["question", "answer"],
            ), "answers"),
        ),
        ToolKind::CreateCoursework => (
            "Create a coursework for a course. When assigneeMode is INDIVIDUAL_STUDENTS, \
             individualStudentsOptions.studentIds lists the students; with ALL_STUDENTS it is omitted",
            object(
                json!({
                    "course_id": string(),
                    "coursework_body": object(
                        json!({
                            "courseId": string(),
                            "title": string(),
                            "description": string(),
                            "materials": array(material()),
                            "state": enumeration(&["DRAFT", "PUBLISHED"]),
                            "workType": enumeration(&[
                                "COURSE_WORK_TYPE_UNSPECIFIED",
                                "ASSIGNMENT",
                                "SHORT_ANSWER_QUESTION",
                                "MULTIPLE_CHOICE_QUESTION",
                            ]),
                            "dueDate": object(
                                json!({"year": number(), "month": number(), "day": number()}),
                                &[],
                            ),
                            "dueTime": object(
                                json!({
                                    "hours": number(),
                                    "minutes": number(),
                                    "seconds": number(),
                                    "nanos": number()
                                }),
                                &[],
                            ),
                            "maxPoints": number(),
                            "submissionModificationMode": enumeration(&[
                                "MODIFIABLE_UNTIL_TURNED_IN",
                                "MODIFIABLE",
                            ]),
                            "assigneeMode": enumeration(&["INDIVIDUAL_STUDENTS", "ALL_STUDENTS"]),
                            "individualStudentsOptions": object(
                                json!({"studentIds": array(string())}),
                                &[],
                            )
                        }),
                        &[
                            "courseId",
                            "title",
                            "description",
                            "materials",
                            "state",
                            "workType",
                            "dueDate",
                            "dueTime",
                            "maxPoints",
                            "assigneeMode",
                            "submissionModificationMode",
                        ],
                    )
                }),
                &["course_id", "coursework_body"],
            ),
        ),
    };

    ToolDeclaration {
        name: kind.name().to_string(),
        description: description.to_string(),
        parameters,
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn string() -> Value {
    json!({"type": "string"})
}

fn number() -> Value {
    json!({"type": "number"})
}

fn array(items: Value) -> Value {
    json!({"type": "array", "items": items})
}

fn enumeration(values: &[&str]) -> Value {
    json!({"type": "string", "enum": values})
}

fn value_object() -> Value {
    object(json!({"value": string()}), &["value"])
}

fn course_and(extra: &[&str]) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert("course_id".to_string(), string());
    let mut required = vec!["course_id"];
    for name in extra {
        properties.insert((*name).to_string(), string());
        required.push(*name);
    }
    object(Value::Object(properties), &required)
}

fn material() -> Value {
    json!({
        "type": "object",
        "properties": {
            "driveFile": object(
                json!({"driveFile": object(
                    json!({"id": string(), "title": string(), "alternateLink": string()}),
                    &["id", "title", "alternateLink"],
                )}),
                &["driveFile"],
            ),
            "link": object(json!({"url": string()}), &["url"])
        }
    })
}

fn document_sections(entry: Value, entries_key: &str) -> Value {
    let mut section_properties = serde_json::Map::new();
    section_properties.insert("part_label".to_string(), string());
    section_properties.insert("marks".to_string(), number());
    section_properties.insert(entries_key.to_string(), array(entry));

    object(
        json!({
            "course_code": string(),
            "course_name": string(),
            "module_number": number(),
            "sections": array(object(
                Value::Object(section_properties),
                &["part_label", "marks", entries_key],
            )),
            "include_images": {"type": "boolean"},
            "dep": string()
        }),
        &["sections"],
    )
}
