// src/seed.rs
use chrono::NaiveDate;

use crate::clock::Clock;
use crate::models::*;
use crate::store::Database;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    // Literal calendar dates below are all valid
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn unit(
    id: &str,
    name: &str,
    code: &str,
    description: &str,
    head_id: &str,
    phone: &str,
    email: &str,
    address: &str,
    status: UnitStatus,
) -> Unit {
    Unit {
        id: id.to_string(),
        name: name.to_string(),
        code: code.to_string(),
        description: description.to_string(),
        head_id: head_id.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        address: address.to_string(),
        status,
    }
}

fn position(
    id: &str,
    name: &str,
    level: &str,
    parent: Option<&str>,
    unit_id: &str,
    description: &str,
) -> Position {
    Position {
        id: id.to_string(),
        name: name.to_string(),
        level: level.to_string(),
        parent_position_id: parent.map(String::from),
        unit_id: unit_id.to_string(),
        description: description.to_string(),
    }
}

/// Sample dataset used on first start and whenever the persisted snapshot is
/// unusable. Today's presences are dated from `clock`.
pub fn initial_data(clock: &Clock) -> Database {
    let units = vec![
        unit(
            "u1",
            "Teknik",
            "TEK",
            "Divisi yang menangani operasional teknis.",
            "e1",
            "081234567890",
            "teknik@pdam.com",
            "Jl. Teknik No. 1, Banggai",
            UnitStatus::Aktif,
        ),
        unit(
            "u2",
            "Administrasi & Keuangan",
            "ADK",
            "Divisi yang menangani administrasi dan keuangan perusahaan.",
            "e2",
            "087654321098",
            "adminkeu@pdam.com",
            "Jl. Administrasi No. 2, Banggai",
            UnitStatus::Aktif,
        ),
        unit(
            "u3",
            "Hubungan Langganan",
            "HUBLA",
            "Divisi yang menangani keluhan dan hubungan dengan pelanggan.",
            "e1",
            "08111222333",
            "hubla@pdam.com",
            "Jl. Pelanggan No. 3, Banggai",
            UnitStatus::NonAktif,
        ),
    ];

    let positions = vec![
        position("p1", "Direktur Utama", "Eselon I", None, "u2", "Memimpin seluruh operasional perusahaan."),
        position("p2", "Manajer Teknik", "Eselon II", Some("p1"), "u1", "Mengelola semua aspek teknis."),
        position("p3", "Staff IT", "Staff", Some("p2"), "u1", "Mendukung infrastruktur teknologi informasi."),
        position("p4", "Staff Keuangan", "Staff", Some("p1"), "u2", "Mengelola keuangan dan akuntansi."),
        position("p5", "Staff HRD", "Staff", Some("p1"), "u2", "Mengelola sumber daya manusia."),
    ];

    let pangkats = vec![
        Pangkat { id: "g1".into(), name: "Golongan I/a".into() },
        Pangkat { id: "g2".into(), name: "Golongan II/a".into() },
        Pangkat { id: "g3".into(), name: "Golongan III/a".into() },
    ];

    let employees = vec![
        Employee {
            id: "e1".into(),
            nik: "1234567890123456".into(),
            name: "Budi Santoso".into(),
            photo_url: "https://picsum.photos/id/1005/200/200".into(),
            position_id: "p2".into(),
            unit_id: "u1".into(),
            employment_status: EmploymentStatus::Tetap,
            status: EmployeeStatus::Aktif,
            birth_place: "Jakarta".into(),
            birth_date: date(1985, 5, 15),
            gender: Gender::LakiLaki,
            last_education: "S1 Teknik Informatika".into(),
            email: "budi.santoso@example.com".into(),
            address: "Jl. Merdeka No. 10, Jakarta".into(),
            phone: "081234567890".into(),
            tmt: date(2010, 1, 10),
            pension_date: Some(date(2050, 5, 15)),
            education_history: vec![
                Education {
                    id: "edu1".into(),
                    level: "S1".into(),
                    institution: "Universitas Indonesia".into(),
                    major: "Teknik Informatika".into(),
                    year: "2008".into(),
                    ijazah_url: String::new(),
                },
                Education {
                    id: "edu2".into(),
                    level: "SMA".into(),
                    institution: "SMA Negeri 1 Jakarta".into(),
                    major: "IPA".into(),
                    year: "2004".into(),
                    ijazah_url: String::new(),
                },
            ],
            work_history: vec![WorkHistory {
                id: "work1".into(),
                company: "PT. Cipta Solusi".into(),
                position: "Software Engineer".into(),
                start_date: "2008".into(),
                end_date: "2010".into(),
            }],
            rank_history: vec![RankHistory {
                id: "rank1".into(),
                rank: "Penata Muda / IIIa".into(),
                tmt: "2015-04-01".into(),
                sk_number: "SK/001/2015".into(),
                sk_document_url: String::new(),
            }],
            career_history: vec![CareerHistory {
                id: "career1".into(),
                position: "Manajer Teknik".into(),
                unit: "Teknik".into(),
                tmt: "2018-01-01".into(),
                sk_document: "SK/DIR/2018/01".into(),
                sk_document_url: String::new(),
            }],
            documents: vec![Document {
                id: "doc1".into(),
                name: "Ijazah S1".into(),
                file_url: String::new(),
                notes: "Fotokopi ijazah legalisir.".into(),
            }],
        },
        Employee {
            id: "e2".into(),
            nik: "6543210987654321".into(),
            name: "Citra Lestari".into(),
            photo_url: "https://picsum.photos/id/1011/200/200".into(),
            position_id: "p4".into(),
            unit_id: "u2".into(),
            employment_status: EmploymentStatus::Tetap,
            status: EmployeeStatus::Aktif,
            birth_place: "Bandung".into(),
            birth_date: date(1990, 8, 20),
            gender: Gender::Perempuan,
            last_education: "S1 Akuntansi".into(),
            email: "citra.lestari@example.com".into(),
            address: "Jl. Asia Afrika No. 5, Bandung".into(),
            phone: "087654321098".into(),
            tmt: date(2015, 3, 12),
            pension_date: Some(date(2055, 8, 20)),
            education_history: Vec::new(),
            work_history: Vec::new(),
            rank_history: Vec::new(),
            career_history: Vec::new(),
            documents: Vec::new(),
        },
    ];

    let admins = vec![Admin {
        id: "a1".into(),
        username: "admin".into(),
        role: Role::Admin,
    }];

    let users = vec![
        User {
            id: "usr1".into(),
            employee_id: "e1".into(),
            email: "budi.santoso@example.com".into(),
            role: Role::User,
        },
        User {
            id: "usr2".into(),
            employee_id: "e2".into(),
            email: "citra.lestari@example.com".into(),
            role: Role::User,
        },
    ];

    let today = clock.today();
    let presences = vec![
        Presence {
            id: "pr1".into(),
            employee_id: "e1".into(),
            date: today,
            status: PresenceStatus::Hadir,
        },
        Presence {
            id: "pr2".into(),
            employee_id: "e2".into(),
            date: today,
            status: PresenceStatus::Hadir,
        },
    ];

    Database {
        employees,
        positions,
        units,
        pangkats,
        admins,
        users,
        cuti_requests: Vec::new(),
        presences,
    }
}
