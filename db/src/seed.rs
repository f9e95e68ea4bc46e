use super::{
    models::{Degree, ScoreKind, Semester, StudentInformations, TeacherInformations, UserKind},
    username_from_name, Database, NewClass, NewScore, NewSubject, NewTeacherSubject, NewUser,
};
use rand::{self, Rng};

const SCHOOL_YEAR: &str = "2024-2025";

// Ids follow insertion order on a freshly reset database: the administrator
// is user 0, then teachers, then students.
const TEACHERS: [(&str, &str, Degree); 4] = [
    ("Teacher", "User", Degree::Master),
    ("Hoa", "Nguyễn Thị", Degree::Master),
    ("Minh", "Trần Văn", Degree::Bachelor),
    ("Hà", "Lê Thu", Degree::Doctor),
];

// (first name, last name, class id)
const STUDENTS: [(&str, &str, u32); 8] = [
    ("Student", "User", 0),
    ("An", "Phạm Minh", 0),
    ("Bình", "Hoàng Gia", 0),
    ("Chi", "Đỗ Khánh", 0),
    ("Dũng", "Vũ Tiến", 1),
    ("Giang", "Bùi Hương", 1),
    ("Khoa", "Ngô Đăng", 2),
    ("Linh", "Đặng Thùy", 2),
];

fn teacher_id(index: usize) -> u32 {
    1 + index as u32
}

fn student_id(index: usize) -> u32 {
    1 + TEACHERS.len() as u32 + index as u32
}

pub fn seed_db<D: Database>(db: &mut D) {
    let users = test_administrators()
        .into_iter()
        .chain(test_teachers())
        .chain(test_students());

    db.seed(
        users,
        test_classes().into_iter(),
        test_subjects().into_iter(),
        test_teacher_subjects().into_iter(),
        test_scores().into_iter(),
    );
}

fn test_administrators() -> Vec<NewUser> {
    vec![NewUser {
        first_name: "Admin".to_string(),
        last_name: "User".to_string(),
        password: "user.admin".to_string(),
        kind: UserKind::Administrator,
    }]
}

fn test_teachers() -> Vec<NewUser> {
    let mut rng = rand::thread_rng();

    TEACHERS
        .iter()
        .map(|(first_name, last_name, degree)| {
            let username = username_from_name(first_name, last_name);

            NewUser {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                password: username.clone(),
                kind: UserKind::Teacher(TeacherInformations {
                    phone_number: Some(random_phone_number(&mut rng)),
                    email: Some(format!("{}@thpt.edu.vn", username)),
                    degree: degree.clone(),
                }),
            }
        })
        .collect()
}

/// Generates a random vietnamese mobile phone number, with a prefix of 09 or 03
fn random_phone_number(rng: &mut impl Rng) -> String {
    (0..10)
        .map(|i| match i {
            0 => 0,
            1 => {
                if rng.gen::<bool>() {
                    9
                } else {
                    3
                }
            }
            _ => rng.gen_range(0, 10),
        })
        .map(|digit: u32| digit.to_string())
        .collect()
}

fn test_students() -> Vec<NewUser> {
    STUDENTS
        .iter()
        .map(|(first_name, last_name, class_id)| NewUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: username_from_name(first_name, last_name),
            kind: UserKind::Student(StudentInformations {
                class_id: *class_id,
                date_of_birth: None,
            }),
        })
        .collect()
}

fn test_classes() -> Vec<NewClass> {
    [("10A1", 10, 0), ("10A2", 10, 1), ("11B1", 11, 3)]
        .iter()
        .map(|(name, grade_level, homeroom)| NewClass {
            name: name.to_string(),
            grade_level: *grade_level,
            school_year: SCHOOL_YEAR.to_string(),
            homeroom_teacher_id: Some(teacher_id(*homeroom)),
        })
        .collect()
}

fn test_subjects() -> Vec<NewSubject> {
    [
        ("Toán", "TOAN"),
        ("Ngữ văn", "VAN"),
        ("Tiếng Anh", "ANH"),
        ("Vật lý", "LY"),
        ("Hóa học", "HOA"),
    ]
    .iter()
    .map(|(name, code)| NewSubject {
        name: name.to_string(),
        code: code.to_string(),
    })
    .collect()
}

fn test_teacher_subjects() -> Vec<NewTeacherSubject> {
    // (teacher index, subject id, class id, lesson period)
    let assignments = [
        (0, 0, 0, "Tiết 1-2 Thứ 2, Tiết 4 Thứ 5"),
        (0, 0, 1, "Tiết 3-4 Thứ 2, Tiết 1-2 Thứ 4"),
        (1, 1, 0, "Tiết 3-4 Thứ 3, Tiết 1 Thứ 6"),
        (1, 1, 1, "Tiết 1-2 Thứ 3"),
        (2, 2, 0, "Tiết 5 Thứ 2, Tiết 2-3 Thứ 6"),
        (3, 3, 2, "Tiết 6-7 Thứ 3"),
        (3, 4, 2, "Tiết 8-9 Thứ 5"),
    ];

    assignments
        .iter()
        .map(
            |(teacher, subject_id, class_id, lesson_period)| NewTeacherSubject {
                teacher_id: teacher_id(*teacher),
                subject_id: *subject_id,
                class_id: *class_id,
                lesson_period: lesson_period.to_string(),
                semester: Semester::First,
                school_year: SCHOOL_YEAR.to_string(),
            },
        )
        .collect()
}

fn test_scores() -> Vec<NewScore> {
    use ScoreKind::*;

    // (student index, subject id, kind, value)
    let scores = [
        (0, 0, Oral, 8.0),
        (0, 0, FifteenMinutes, 7.5),
        (0, 0, Midterm, 8.5),
        (0, 0, Final, 9.0),
        (0, 1, Oral, 7.0),
        (0, 1, Midterm, 6.5),
        (0, 1, Final, 7.0),
        (0, 2, FifteenMinutes, 9.0),
        (0, 2, Final, 8.0),
        (1, 0, Midterm, 5.5),
        (1, 0, Final, 6.0),
    ];

    scores
        .iter()
        .map(|(student, subject_id, kind, value)| NewScore {
            student_id: student_id(*student),
            subject_id: *subject_id,
            kind: *kind,
            value: *value,
            semester: Semester::First,
            school_year: SCHOOL_YEAR.to_string(),
        })
        .collect()
}
