//! Deterministic dashboard data provider.
//!
//! Every figure is derived from a seeded generator keyed by an identity string
//! (school id, teacher id, class id or county name). The same key always yields
//! the same output; the hash and the integer mapping are kept bit-compatible with
//! the snapshots the browser client already renders.

use crate::models::{
    Announcement, Attendance, ClassPerformance, CountyDashboard, EngagementPoint, Initiative,
    InventoryItem, Kpi, RegisterEntry, ResourceLevel, SchoolHeadDashboard, TeacherClass,
    TeacherDashboard,
};

/// 32-bit string-seeded generator.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: &str) -> Self {
        let units: Vec<u16> = seed.encode_utf16().collect();
        let mut h: u32 = 1_779_033_703 ^ units.len() as u32;
        for unit in units {
            h = (h ^ u32::from(unit)).wrapping_mul(3_432_918_353);
            h = h.rotate_left(13);
        }
        Self { state: h }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut h = self.state;
        h = (h ^ (h >> 16)).wrapping_mul(2_246_822_507);
        h = (h ^ (h >> 13)).wrapping_mul(3_266_489_909);
        h ^= h >> 16;
        self.state = h;
        h
    }

    /// Integer in `[min, max]`. The top draw (`u32::MAX`) maps to `max + 1`,
    /// matching the established snapshots.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        let r = f64::from(self.next_u32());
        (r / 4_294_967_295.0 * (max - min + 1) as f64 + min as f64).floor() as i64
    }

    /// Index into a slice of `len` items.
    fn pick(&mut self, len: usize) -> usize {
        (self.range(0, len as i64 - 1).max(0) as usize).min(len - 1)
    }
}

/// Resource tier assigned to a school.
pub fn student_resource_level(school_id: &str) -> ResourceLevel {
    let mut rng = SeededRng::new(school_id);
    ResourceLevel::ALL[(rng.next_u32() % 3) as usize]
}

/// Teacher assigned to a student.
///
/// There is no student/teacher mapping table yet, so a student is its own key.
pub fn teacher_id_for_student(student_id: &str) -> String {
    student_id.to_string()
}

pub fn teacher_dashboard(teacher_id: &str) -> TeacherDashboard {
    let mut rng = SeededRng::new(teacher_id);
    let kpis = vec![
        Kpi::new("Total Classes", rng.range(2, 5).to_string()),
        Kpi::new("Total Students", rng.range(60, 150).to_string()),
        Kpi::new("Upcoming Tasks", rng.range(3, 10).to_string()),
        Kpi::new("Avg. Class Performance", format!("{}%", rng.range(65, 85)))
            .with_change(rng.range(-5, 5)),
    ];
    let performance_data = [
        ("Grade 4 Maths", 60, 90),
        ("Grade 4 English", 70, 95),
        ("Grade 5 Science", 55, 80),
        ("Grade 5 Swahili", 68, 88),
    ]
    .into_iter()
    .map(|(name, min, max)| ClassPerformance {
        name: name.to_string(),
        performance: rng.range(min, max),
    })
    .collect();

    TeacherDashboard {
        kpis,
        performance_data,
    }
}

const SUBJECTS: [&str; 5] = ["Mathematics", "English", "Science", "Swahili", "Social Studies"];
const GRADES: [u8; 3] = [4, 5, 6];

pub fn teacher_classes(teacher_id: &str) -> Vec<TeacherClass> {
    let mut rng = SeededRng::new(&format!("{}classes", teacher_id));
    let count = rng.range(2, 5);
    let prefix: String = teacher_id.chars().take(4).collect();

    (0..count as usize)
        .map(|i| TeacherClass {
            id: format!("class-{}-{}", i, prefix),
            name: format!("{} Grade {}", SUBJECTS[i % SUBJECTS.len()], GRADES[i % GRADES.len()]),
            student_count: rng.range(25, 40),
        })
        .collect()
}

const FIRST_NAMES: [&str; 10] = [
    "Asha", "Baraka", "Chep", "David", "Esther", "Fatuma", "Gideon", "Halima", "Imani", "Juma",
];
const LAST_NAMES: [&str; 8] = [
    "Mwangi", "Otieno", "Kariuki", "Wanjala", "Akinyi", "Kimani", "Ochieng", "Njoroge",
];
const PRESENT_THRESHOLD: u32 = 1_000_000_000;

/// Default register for a class, before any stored attendance is applied.
pub fn student_register(class_id: &str) -> Vec<RegisterEntry> {
    let mut rng = SeededRng::new(class_id);
    let count = rng.range(25, 40);

    (0..count)
        .map(|i| {
            let first = FIRST_NAMES[rng.pick(FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.pick(LAST_NAMES.len())];
            let morning = rng.next_u32() > PRESENT_THRESHOLD;
            let evening = rng.next_u32() > PRESENT_THRESHOLD;
            RegisterEntry {
                id: format!("student-{}-{}", i, class_id),
                name: format!("{} {}", first, last),
                attendance: Attendance { morning, evening },
            }
        })
        .collect()
}

pub fn school_head_dashboard(school_id: &str) -> SchoolHeadDashboard {
    let mut rng = SeededRng::new(school_id);
    let kpis = vec![
        Kpi::new("Compliance Status", "92%").with_change(rng.range(-2, 3)),
        Kpi::new("Student-Teacher Ratio", format!("{}:1", rng.range(28, 45))),
        Kpi::new("Resource Levels", "Adequate"),
        Kpi::new("Staff Attendance", "98%").with_change(rng.range(-1, 1)),
    ];
    let resource_inventory = vec![
        inventory("Grade 4 Textbooks", "Available", rng.range(80, 100)),
        inventory("Science Kits", "Low Stock", rng.range(15, 30)),
        inventory("Laptops", "Available", rng.range(60, 90)),
        inventory("Projectors", "Out of Stock", 0),
    ];
    let announcements = vec![
        Announcement {
            id: 1,
            title: "Staff Meeting: Term 2 Planning".to_string(),
            date: "2024-08-05".to_string(),
            content: "All staff are required to attend the Term 2 planning meeting in the staff room at 2 PM.".to_string(),
        },
        Announcement {
            id: 2,
            title: "CBC Training Workshop".to_string(),
            date: "2024-07-28".to_string(),
            content: "A workshop on the new CBC assessment guidelines will be held this Friday.".to_string(),
        },
    ];

    SchoolHeadDashboard {
        kpis,
        resource_inventory,
        announcements,
    }
}

fn inventory(name: &str, status: &str, level: i64) -> InventoryItem {
    InventoryItem {
        name: name.to_string(),
        status: status.to_string(),
        level,
    }
}

pub fn county_dashboard(county: &str) -> CountyDashboard {
    let mut rng = SeededRng::new(county);
    let kpis = vec![
        Kpi::new("Total Students", group_thousands(rng.range(15_000, 25_000))),
        Kpi::new("Active Teachers", group_thousands(rng.range(500, 800))),
        Kpi::new("Resource Availability", "78%").with_change(rng.range(-3, 3)),
        Kpi::new("Compliance Rate", "85%").with_change(rng.range(1, 4)),
    ];
    let engagement_data = [
        ("Jan", 18_000),
        ("Feb", 18_500),
        ("Mar", 19_000),
        ("Apr", 18_200),
        ("May", 19_500),
        ("Jun", 21_000),
    ]
    .into_iter()
    .map(|(name, students)| EngagementPoint {
        name: name.to_string(),
        students,
    })
    .collect();
    let initiatives = [
        (1, "Digital Literacy Program", "Ongoing", 65),
        (2, "School Feeding Program", "Completed", 100),
        (3, "Teacher Upskilling Initiative", "Planning", 15),
    ]
    .into_iter()
    .map(|(id, name, status, progress)| Initiative {
        id,
        name: name.to_string(),
        status: status.to_string(),
        progress,
    })
    .collect();

    CountyDashboard {
        kpis,
        engagement_data,
        initiatives,
    }
}

/// `18432` -> `"18,432"`.
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
